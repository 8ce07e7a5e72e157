//! Domain layer for typist-control: configuration and the JSON message
//! shapes of the control API.  No I/O.

pub mod config;
pub mod messages;

pub use config::ControlConfig;
pub use messages::{CommandResponse, KeypressRequest, StatusResponse, TypeRequest};
