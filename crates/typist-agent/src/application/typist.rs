//! Typist: turns text and key names into paced key presses.
//!
//! This use case sits at the application layer and delegates to a
//! [`KeystrokeSink`] trait object for the device write.  The HID gadget
//! writer and the in-memory recorder are in the infrastructure layer.
//!
//! # Pacing (for beginners)
//!
//! The terminal application on the other end of the USB cable reads keys
//! from a normal keyboard buffer.  Sending reports back-to-back can overrun
//! it and drop characters, so every character is followed by a configurable
//! pause, and every named key (Tab, Enter, ...) by a fixed key-press pause.
//! Pauses go through the injected [`Sleeper`] so tests run instantly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, warn};
use typist_core::{encode, KeyName, Keystroke};

use super::ports::Sleeper;

/// Pause after each named key press.
pub const DEFAULT_KEY_PRESS_DELAY: Duration = Duration::from_millis(100);

/// Error type for key press delivery.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The gadget device node is absent.  Fatal when opening at startup;
    /// during a pass the node is retried on the next press.
    #[error("HID device {path} does not exist")]
    DeviceMissing { path: PathBuf },

    #[error("failed to write HID report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key press rejected: {0}")]
    Rejected(String),
}

impl SinkError {
    pub fn is_device_missing(&self) -> bool {
        matches!(self, SinkError::DeviceMissing { .. })
    }
}

/// Destination for key presses.
///
/// `press` must deliver the press report followed by the all-zero release
/// report before returning.
#[cfg_attr(test, mockall::automock)]
pub trait KeystrokeSink: Send + Sync {
    fn press(&self, keystroke: Keystroke) -> Result<(), SinkError>;
}

/// Types text and presses named keys through a [`KeystrokeSink`].
#[derive(Clone)]
pub struct Typist {
    sink: Arc<dyn KeystrokeSink>,
    sleeper: Arc<dyn Sleeper>,
    key_press_delay: Duration,
}

impl Typist {
    pub fn new(sink: Arc<dyn KeystrokeSink>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            sink,
            sleeper,
            key_press_delay: DEFAULT_KEY_PRESS_DELAY,
        }
    }

    /// Overrides the pause after each named key press.
    pub fn with_key_press_delay(mut self, delay: Duration) -> Self {
        self.key_press_delay = delay;
        self
    }

    /// Types `text` one character at a time, pausing `inter_key_delay` after
    /// every character.
    ///
    /// Characters without a US-layout key are sent as a no-op press so the
    /// rest of the text still goes out.
    ///
    /// # Errors
    ///
    /// Returns the first [`SinkError`]; the remaining characters are not sent.
    pub async fn type_text(&self, text: &str, inter_key_delay: Duration) -> Result<(), SinkError> {
        debug!(chars = text.chars().count(), "typing text");
        for c in text.chars() {
            let keystroke = encode(c);
            if keystroke == Keystroke::NO_EVENT {
                warn!(character = ?c, "no key for character, sending no-op press");
            }
            self.press(keystroke)?;
            self.sleeper.sleep(inter_key_delay).await;
        }
        Ok(())
    }

    /// Presses the key called `name` `times` times.
    ///
    /// Names are `enter`, `tab`, `esc`/`escape`, `space`, `backspace`, or a
    /// numeric Usage ID.  An unknown name logs a warning and sends nothing,
    /// but the key-press pause still applies.  Returns whether the name was
    /// recognised.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if a press cannot be delivered.
    pub async fn press_key_by_name(&self, name: &str, times: u32) -> Result<bool, SinkError> {
        let keystroke = KeyName::parse(name).keystroke();
        if keystroke.is_none() {
            warn!(key = name, "unknown key name, ignoring");
        }
        for _ in 0..times {
            if let Some(keystroke) = keystroke {
                debug!(key = name, code = keystroke.key_code, "pressing key");
                self.press(keystroke)?;
            }
            self.sleeper.sleep(self.key_press_delay).await;
        }
        Ok(keystroke.is_some())
    }

    /// Presses a single keystroke and applies the key-press pause.
    pub async fn press_keystroke(&self, keystroke: Keystroke) -> Result<(), SinkError> {
        self.press(keystroke)?;
        self.sleeper.sleep(self.key_press_delay).await;
        Ok(())
    }

    fn press(&self, keystroke: Keystroke) -> Result<(), SinkError> {
        self.sink.press(keystroke).map_err(|e| {
            error!("HID write failed: {e}");
            e
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
