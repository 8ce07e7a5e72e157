//! Key encoding for keyboard emulation.
//!
//! The canonical representation is USB HID Usage IDs (page 0x07,
//! Keyboard/Keypad) plus the boot-protocol modifier byte.  Characters are
//! translated with the US layout table in [`us_layout`]; logical key names
//! used by configuration ("enter", "tab", "27") are resolved by [`KeyName`].

pub mod hid;
pub mod us_layout;

pub use hid::{HidKeyCode, ModifierFlags};
pub use us_layout::{decode, encode};

/// A single key press: modifier byte plus Usage ID.
///
/// `key_code` is kept as a raw `u8` because configuration may name any code
/// numerically, including ones outside [`HidKeyCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keystroke {
    pub modifiers: ModifierFlags,
    pub key_code: u8,
}

impl Keystroke {
    /// The no-op press emitted for unsupported characters.
    pub const NO_EVENT: Keystroke = Keystroke {
        modifiers: ModifierFlags::NONE,
        key_code: 0,
    };

    pub fn new(modifiers: ModifierFlags, key: HidKeyCode) -> Self {
        Self {
            modifiers,
            key_code: key.as_u8(),
        }
    }

    /// A press of an arbitrary numeric key code with no modifier.
    pub fn raw(key_code: u8) -> Self {
        Self {
            modifiers: ModifierFlags::NONE,
            key_code,
        }
    }
}

impl From<HidKeyCode> for Keystroke {
    fn from(key: HidKeyCode) -> Self {
        Keystroke::new(ModifierFlags::NONE, key)
    }
}

/// A logical key name as written in configuration or sent to the control
/// server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyName {
    /// A well-known named key (`enter`, `tab`, `esc`/`escape`, `space`, `backspace`).
    Named(HidKeyCode),
    /// A numeric Usage ID such as `"40"`.
    Code(u8),
    /// Anything else.  Pressing it is a no-op.
    Unknown,
}

impl KeyName {
    /// Parses a key name, case-insensitively.
    pub fn parse(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        let named = match lower.as_str() {
            "enter" => Some(HidKeyCode::Enter),
            "tab" => Some(HidKeyCode::Tab),
            "esc" | "escape" => Some(HidKeyCode::Escape),
            "space" => Some(HidKeyCode::Space),
            "backspace" => Some(HidKeyCode::Backspace),
            _ => None,
        };
        if let Some(key) = named {
            return KeyName::Named(key);
        }
        match lower.parse::<u8>() {
            Ok(code) => KeyName::Code(code),
            Err(_) => KeyName::Unknown,
        }
    }

    /// The key press for this name, or `None` for [`KeyName::Unknown`].
    pub fn keystroke(self) -> Option<Keystroke> {
        match self {
            KeyName::Named(key) => Some(Keystroke::from(key)),
            KeyName::Code(code) => Some(Keystroke::raw(code)),
            KeyName::Unknown => None,
        }
    }
}
