//! Infrastructure layer for typist-control: the HTTP listener and the HTTP
//! client used by the CLI subcommands.

pub mod client;
pub mod http_server;

pub use client::{ClientError, ControlClient};
pub use http_server::{run_server, serve};
