//! USB HID boot-protocol keyboard report.
//!
//! Layout (8 bytes):
//! ```text
//! Byte 0: Modifier keys (bitfield, see ModifierFlags)
//! Byte 1: Reserved (0x00)
//! Byte 2: Key code (USB HID Usage ID)
//! Byte 3-7: Further simultaneous key codes, always zero here
//! ```
//!
//! Every press is followed by an all-zero [`RELEASE_REPORT`].  Without it the
//! host keeps the key held down and the receiving application auto-repeats.

use thiserror::Error;

use crate::keymap::{Keystroke, ModifierFlags};

/// Keyboard report size in bytes.
pub const REPORT_LEN: usize = 8;

/// The all-keys-released report.
pub const RELEASE_REPORT: [u8; REPORT_LEN] = [0; REPORT_LEN];

/// Error returned when parsing raw report bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("keyboard report must be {REPORT_LEN} bytes, got {0}")]
    Length(usize),
}

/// A single-key boot-protocol report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardReport {
    pub modifiers: ModifierFlags,
    pub key_code: u8,
}

impl KeyboardReport {
    /// Report that presses `keystroke`.
    pub fn press(keystroke: Keystroke) -> Self {
        Self {
            modifiers: keystroke.modifiers,
            key_code: keystroke.key_code,
        }
    }

    /// Serializes into the 8-byte wire format.
    pub fn to_bytes(&self) -> [u8; REPORT_LEN] {
        let mut buf = [0u8; REPORT_LEN];
        buf[0] = self.modifiers.bits();
        buf[2] = self.key_code;
        buf
    }

    /// Parses 8 raw bytes.  Only the first key slot is read.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReportError> {
        if bytes.len() != REPORT_LEN {
            return Err(ReportError::Length(bytes.len()));
        }
        Ok(Self {
            modifiers: ModifierFlags(bytes[0]),
            key_code: bytes[2],
        })
    }

    /// `true` for the release report.
    pub fn is_release(&self) -> bool {
        self.modifiers == ModifierFlags::NONE && self.key_code == 0
    }
}
