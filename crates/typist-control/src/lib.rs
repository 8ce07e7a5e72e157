//! typist-control library crate.
//!
//! A small HTTP service that lets another machine on the LAN type text or
//! press keys through the same HID gadget keyboard the agent uses, plus a
//! client for it.
//!
//! # Architecture
//!
//! ```text
//! curl / typist-control type "..."
//!         ↕  JSON over HTTP/1.1
//! [typist-control]
//!   ├── domain/           ControlConfig, request/response bodies
//!   ├── application/      ControlService, ServerState, key resolution
//!   └── infrastructure/
//!         ├── http_server  accept loop, framing, routing
//!         └── client       reqwest client for the CLI
//!         ↓
//! typist_agent::Typist → KeystrokeSink → /dev/hidg0
//! ```

/// Domain layer: configuration and message types (no I/O).
pub mod domain;

/// Application layer: request handling and server state.
pub mod application;

/// Infrastructure layer: HTTP server and client.
pub mod infrastructure;
