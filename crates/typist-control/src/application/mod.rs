//! Application layer for typist-control.
//!
//! Turns decoded control requests into Typist calls and keeps the counters
//! reported by `/status`.  Knows nothing about sockets or HTTP framing.

pub mod control_service;

pub use control_service::{format_uptime, resolve_key, ControlError, ControlService, ServerState};
