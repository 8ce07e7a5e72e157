//! # typist-core
//!
//! Shared library for sheet-typist containing the keyboard encoding tables,
//! the USB HID boot-protocol report format, and the pure row transformation
//! rules applied to spreadsheet records before they are typed.
//!
//! This crate is used by both the automation agent and the remote control
//! server.  It has zero dependencies on OS APIs, network sockets, or the
//! file system.
//!
//! # Architecture overview (for beginners)
//!
//! sheet-typist reads weighbridge tickets from a spreadsheet and types them
//! into a legacy terminal application by pretending to be a USB keyboard.
//! The terminal has no API, so keystrokes are the only way in.
//!
//! This crate (`typist-core`) is the shared foundation.  It defines:
//!
//! - **`keymap`** – How a character becomes a key press.  Every printable
//!   character is translated into a USB HID Usage ID plus a modifier bitmask
//!   (e.g. `'A'` is key `0x04` with Shift held).
//!
//! - **`report`** – How a key press becomes bytes.  The HID gadget device
//!   accepts fixed 8-byte "boot protocol" keyboard reports.
//!
//! - **`domain`** – Pure business logic with no I/O: the ordered [`Row`]
//!   type, the [`EntryTransformer`] that splits timestamps and composite
//!   vehicle fields, and the [`EntryId`] dedup key.

pub mod domain;
pub mod keymap;
pub mod report;

// Re-export the most-used types at the crate root so callers can write
// `typist_core::Row` instead of `typist_core::domain::row::Row`.
pub use domain::entry_id::EntryId;
pub use domain::row::{Row, SheetSnapshot};
pub use domain::transform::{EntryTransformer, FieldMappings, TransformRules};
pub use keymap::hid::{HidKeyCode, ModifierFlags};
pub use keymap::{decode, encode, KeyName, Keystroke};
pub use report::KeyboardReport;
