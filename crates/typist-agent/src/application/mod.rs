//! Application layer use cases for the agent.
//!
//! # What use cases does the agent have?
//!
//! - **`typist`** – Turns text and key names into key presses.  The actual
//!   device write is made by a `KeystrokeSink` implementation that is
//!   injected at construction time.
//!
//! - **`automation`** – The Polling/Idle loop that fetches rows, skips those
//!   already in the ledger, types the rest, and records them.
//!
//! - **`ports`** – The traits the loop depends on (row source, ledger,
//!   sleeper).  Infrastructure provides the implementations.

pub mod automation;
pub mod ports;
pub mod typist;
