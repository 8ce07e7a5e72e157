//! typist-agent library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does typist-agent do? (for beginners)
//!
//! The agent runs on a small Linux board (e.g. a Raspberry Pi Zero) that is
//! plugged into the terminal PC over USB and configured as a *USB HID gadget*:
//! to the PC it looks like an ordinary keyboard.  The agent:
//!
//! 1. Polls a Google Sheet that a web form appends weighbridge tickets to.
//! 2. Reloads a local CSV ledger of tickets it has already typed.
//! 3. Transforms each row (timestamp → date + time, "RMC TRUCK 250" →
//!    vehicle + cost) and derives a dedup identifier.
//! 4. Types every new ticket into the focused terminal form, field by field,
//!    by writing 8-byte keyboard reports to `/dev/hidg0`.
//! 5. Appends the ticket's identifier to the ledger so it is never typed twice.

/// Application layer: typing and the polling loop.
pub mod application;

/// Infrastructure layer: HID device, spreadsheet client, ledger file, config.
pub mod infrastructure;
