//! Character ↔ key press tables for a US QWERTY layout.
//!
//! [`encode`] never fails: characters that are not on the table become a
//! [`HidKeyCode::NoEvent`] press so that an in-progress entry always reaches
//! its remaining fields.

use super::hid::{HidKeyCode, ModifierFlags};
use super::Keystroke;

/// Shifted symbols and the unshifted character on the same physical key.
pub const SHIFTED_SYMBOLS: &[(char, char)] = &[
    ('!', '1'),
    ('@', '2'),
    ('#', '3'),
    ('$', '4'),
    ('%', '5'),
    ('^', '6'),
    ('&', '7'),
    ('*', '8'),
    ('(', '9'),
    (')', '0'),
    ('_', '-'),
    ('+', '='),
    ('{', '['),
    ('}', ']'),
    ('|', '\\'),
    (':', ';'),
    ('"', '\''),
    ('<', ','),
    ('>', '.'),
    ('?', '/'),
];

/// Looks up the unshifted key for a lower-case character.
fn base_key(c: char) -> Option<HidKeyCode> {
    if c.is_ascii_lowercase() {
        return Some(HidKeyCode::LETTERS[(c as u8 - b'a') as usize]);
    }
    let key = match c {
        '1' => HidKeyCode::Digit1,
        '2' => HidKeyCode::Digit2,
        '3' => HidKeyCode::Digit3,
        '4' => HidKeyCode::Digit4,
        '5' => HidKeyCode::Digit5,
        '6' => HidKeyCode::Digit6,
        '7' => HidKeyCode::Digit7,
        '8' => HidKeyCode::Digit8,
        '9' => HidKeyCode::Digit9,
        '0' => HidKeyCode::Digit0,
        ' ' => HidKeyCode::Space,
        '\t' => HidKeyCode::Tab,
        '\n' => HidKeyCode::Enter,
        '-' => HidKeyCode::Minus,
        '=' => HidKeyCode::Equal,
        '[' => HidKeyCode::BracketLeft,
        ']' => HidKeyCode::BracketRight,
        '\\' => HidKeyCode::Backslash,
        ';' => HidKeyCode::Semicolon,
        '\'' => HidKeyCode::Quote,
        '`' => HidKeyCode::Backquote,
        ',' => HidKeyCode::Comma,
        '.' => HidKeyCode::Period,
        '/' => HidKeyCode::Slash,
        _ => return None,
    };
    Some(key)
}

/// Reverse of [`base_key`].
fn base_char(key: HidKeyCode) -> Option<char> {
    let c = match key {
        HidKeyCode::Digit1 => '1',
        HidKeyCode::Digit2 => '2',
        HidKeyCode::Digit3 => '3',
        HidKeyCode::Digit4 => '4',
        HidKeyCode::Digit5 => '5',
        HidKeyCode::Digit6 => '6',
        HidKeyCode::Digit7 => '7',
        HidKeyCode::Digit8 => '8',
        HidKeyCode::Digit9 => '9',
        HidKeyCode::Digit0 => '0',
        HidKeyCode::Space => ' ',
        HidKeyCode::Tab => '\t',
        HidKeyCode::Enter => '\n',
        HidKeyCode::Minus => '-',
        HidKeyCode::Equal => '=',
        HidKeyCode::BracketLeft => '[',
        HidKeyCode::BracketRight => ']',
        HidKeyCode::Backslash => '\\',
        HidKeyCode::Semicolon => ';',
        HidKeyCode::Quote => '\'',
        HidKeyCode::Backquote => '`',
        HidKeyCode::Comma => ',',
        HidKeyCode::Period => '.',
        HidKeyCode::Slash => '/',
        HidKeyCode::Escape | HidKeyCode::Backspace | HidKeyCode::NoEvent => return None,
        letter => (b'a' + (letter.as_u8() - HidKeyCode::KeyA.as_u8())) as char,
    };
    Some(c)
}

/// Encodes one character as a key press.
///
/// Uppercase ASCII letters and the symbols in [`SHIFTED_SYMBOLS`] resolve to
/// the unshifted key with [`ModifierFlags::SHIFT`].  Anything else that is not
/// on the table resolves to [`HidKeyCode::NoEvent`] with no modifier.
pub fn encode(c: char) -> Keystroke {
    if let Some(&(_, base)) = SHIFTED_SYMBOLS.iter().find(|(shifted, _)| *shifted == c) {
        return match base_key(base) {
            Some(key) => Keystroke::new(ModifierFlags::SHIFT, key),
            None => Keystroke::NO_EVENT,
        };
    }

    if c.is_ascii_uppercase() {
        return match base_key(c.to_ascii_lowercase()) {
            Some(key) => Keystroke::new(ModifierFlags::SHIFT, key),
            None => Keystroke::NO_EVENT,
        };
    }

    match base_key(c) {
        Some(key) => Keystroke::new(ModifierFlags::NONE, key),
        None => Keystroke::NO_EVENT,
    }
}

/// Recovers the character a key press would produce on a US layout.
///
/// Returns `None` for the no-op key, non-printing keys, Ctrl chords, and codes
/// outside the table.
pub fn decode(keystroke: Keystroke) -> Option<char> {
    if keystroke.modifiers.ctrl() {
        return None;
    }
    let key = HidKeyCode::from_u8(keystroke.key_code)?;
    let base = base_char(key)?;

    if !keystroke.modifiers.shift() {
        return Some(base);
    }
    if base.is_ascii_lowercase() {
        return Some(base.to_ascii_uppercase());
    }
    SHIFTED_SYMBOLS
        .iter()
        .find(|(_, unshifted)| *unshifted == base)
        .map(|&(shifted, _)| shifted)
}
