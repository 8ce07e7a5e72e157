//! Infrastructure layer for the agent.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `typist_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`hid_gadget`** – Writes boot-protocol reports to `/dev/hidg0`.
//! - **`recording`** – In-memory `KeystrokeSink` for tests and `--dry-run`.
//! - **`sleeper`** – Tokio-backed and recording implementations of `Sleeper`.
//! - **`sheets`** – Google Sheets v4 values client (`RowSource`).
//! - **`ledger`** – CSV ledger of processed identifiers (`EntryLedger`).
//! - **`config`** – TOML configuration file.

pub mod config;
pub mod hid_gadget;
pub mod ledger;
pub mod recording;
pub mod sheets;
pub mod sleeper;
