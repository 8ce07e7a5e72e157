//! USB HID Usage IDs (page 0x07, Keyboard/Keypad page) and modifier bits.
//!
//! Only the keys a US-layout typist needs are listed: letters, digits, the
//! punctuation row, whitespace, and the handful of control keys that the
//! terminal application uses to move between fields.
//!
//! Reference: USB HID Usage Tables 1.3, Section 10 (Keyboard/Keypad page 0x07).
//!
//! # What is a HID Usage ID? (for beginners)
//!
//! The **USB Human Interface Device (HID)** standard assigns a unique number to
//! every key on a keyboard.  These numbers are called *Usage IDs*.
//!
//! | Key          | HID Usage ID |
//! |--------------|-------------|
//! | Letter A     | 0x04        |
//! | Digit 1      | 0x1E        |
//! | Enter        | 0x28        |
//! | Tab          | 0x2B        |
//!
//! HID codes represent **physical key positions**, not characters.  `'a'` and
//! `'A'` share the same Usage ID; the difference is whether Shift is held,
//! which is carried in a separate modifier byte.
//!
//! # The `NoEvent` code
//!
//! Usage ID `0x00` means "no key pressed".  The encoder maps unsupported
//! characters to it so the receiving machine sees a harmless empty press
//! instead of the whole entry aborting.

use serde::{Deserialize, Serialize};

/// USB HID Usage ID for keyboard keys (page 0x07).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HidKeyCode {
    // Letters (HID 0x04–0x1D)
    KeyA = 0x04,
    KeyB = 0x05,
    KeyC = 0x06,
    KeyD = 0x07,
    KeyE = 0x08,
    KeyF = 0x09,
    KeyG = 0x0A,
    KeyH = 0x0B,
    KeyI = 0x0C,
    KeyJ = 0x0D,
    KeyK = 0x0E,
    KeyL = 0x0F,
    KeyM = 0x10,
    KeyN = 0x11,
    KeyO = 0x12,
    KeyP = 0x13,
    KeyQ = 0x14,
    KeyR = 0x15,
    KeyS = 0x16,
    KeyT = 0x17,
    KeyU = 0x18,
    KeyV = 0x19,
    KeyW = 0x1A,
    KeyX = 0x1B,
    KeyY = 0x1C,
    KeyZ = 0x1D,

    // Digits (HID 0x1E–0x27)
    Digit1 = 0x1E,
    Digit2 = 0x1F,
    Digit3 = 0x20,
    Digit4 = 0x21,
    Digit5 = 0x22,
    Digit6 = 0x23,
    Digit7 = 0x24,
    Digit8 = 0x25,
    Digit9 = 0x26,
    Digit0 = 0x27,

    // Control keys and punctuation (HID 0x28–0x38)
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Equal = 0x2E,
    BracketLeft = 0x2F,
    BracketRight = 0x30,
    Backslash = 0x31,
    Semicolon = 0x33,
    Quote = 0x34,
    Backquote = 0x35,
    Comma = 0x36,
    Period = 0x37,
    Slash = 0x38,

    /// No key pressed.  Used for characters that have no mapping.
    NoEvent = 0x00,
}

impl HidKeyCode {
    /// Letters in alphabetical order, indexed by `c - 'a'`.
    pub const LETTERS: [HidKeyCode; 26] = [
        HidKeyCode::KeyA,
        HidKeyCode::KeyB,
        HidKeyCode::KeyC,
        HidKeyCode::KeyD,
        HidKeyCode::KeyE,
        HidKeyCode::KeyF,
        HidKeyCode::KeyG,
        HidKeyCode::KeyH,
        HidKeyCode::KeyI,
        HidKeyCode::KeyJ,
        HidKeyCode::KeyK,
        HidKeyCode::KeyL,
        HidKeyCode::KeyM,
        HidKeyCode::KeyN,
        HidKeyCode::KeyO,
        HidKeyCode::KeyP,
        HidKeyCode::KeyQ,
        HidKeyCode::KeyR,
        HidKeyCode::KeyS,
        HidKeyCode::KeyT,
        HidKeyCode::KeyU,
        HidKeyCode::KeyV,
        HidKeyCode::KeyW,
        HidKeyCode::KeyX,
        HidKeyCode::KeyY,
        HidKeyCode::KeyZ,
    ];

    /// Converts a raw Usage ID to a [`HidKeyCode`].
    ///
    /// Returns `None` for IDs outside the table.  Callers that accept arbitrary
    /// numeric key codes keep the raw `u8` instead.
    pub fn from_u8(value: u8) -> Option<Self> {
        if (0x04..=0x1D).contains(&value) {
            return Some(Self::LETTERS[(value - 0x04) as usize]);
        }
        let code = match value {
            0x00 => HidKeyCode::NoEvent,
            0x1E => HidKeyCode::Digit1,
            0x1F => HidKeyCode::Digit2,
            0x20 => HidKeyCode::Digit3,
            0x21 => HidKeyCode::Digit4,
            0x22 => HidKeyCode::Digit5,
            0x23 => HidKeyCode::Digit6,
            0x24 => HidKeyCode::Digit7,
            0x25 => HidKeyCode::Digit8,
            0x26 => HidKeyCode::Digit9,
            0x27 => HidKeyCode::Digit0,
            0x28 => HidKeyCode::Enter,
            0x29 => HidKeyCode::Escape,
            0x2A => HidKeyCode::Backspace,
            0x2B => HidKeyCode::Tab,
            0x2C => HidKeyCode::Space,
            0x2D => HidKeyCode::Minus,
            0x2E => HidKeyCode::Equal,
            0x2F => HidKeyCode::BracketLeft,
            0x30 => HidKeyCode::BracketRight,
            0x31 => HidKeyCode::Backslash,
            0x33 => HidKeyCode::Semicolon,
            0x34 => HidKeyCode::Quote,
            0x35 => HidKeyCode::Backquote,
            0x36 => HidKeyCode::Comma,
            0x37 => HidKeyCode::Period,
            0x38 => HidKeyCode::Slash,
            _ => return None,
        };
        Some(code)
    }

    /// Returns the raw USB HID Usage ID value for this key code.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Modifier byte of a boot-protocol keyboard report (byte 0).
///
/// Bit layout follows the HID specification: the eight modifier keys
/// `0xE0..=0xE7` map to bits 0..=7.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifierFlags(pub u8);

impl ModifierFlags {
    pub const LEFT_CTRL: u8 = 1 << 0;
    pub const LEFT_SHIFT: u8 = 1 << 1;
    pub const LEFT_ALT: u8 = 1 << 2;
    pub const LEFT_META: u8 = 1 << 3;
    pub const RIGHT_CTRL: u8 = 1 << 4;
    pub const RIGHT_SHIFT: u8 = 1 << 5;
    pub const RIGHT_ALT: u8 = 1 << 6;
    pub const RIGHT_META: u8 = 1 << 7;

    /// No modifier held.
    pub const NONE: ModifierFlags = ModifierFlags(0);

    /// The shift modifier asserted for uppercase letters and shifted symbols.
    ///
    /// Right Shift (`0x20`) is what goes on the wire.
    pub const SHIFT: ModifierFlags = ModifierFlags(Self::RIGHT_SHIFT);

    /// Returns `true` if either Shift modifier is active.
    pub fn shift(&self) -> bool {
        self.0 & (Self::LEFT_SHIFT | Self::RIGHT_SHIFT) != 0
    }

    /// Returns `true` if either Ctrl modifier is active.
    pub fn ctrl(&self) -> bool {
        self.0 & (Self::LEFT_CTRL | Self::RIGHT_CTRL) != 0
    }

    /// Raw modifier byte.
    pub fn bits(self) -> u8 {
        self.0
    }
}
