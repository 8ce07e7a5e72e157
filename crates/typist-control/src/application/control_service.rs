//! Control request handling on top of a shared [`Typist`].
//!
//! # Why two locks?
//!
//! - The `Typist` sits behind a `tokio::sync::Mutex` because a `/type`
//!   request awaits for the whole duration of its text.  Two requests never
//!   interleave their keystrokes; the second waits for the first.
//! - [`ServerState`] sits behind a `std::sync::Mutex`.  It is only touched
//!   for a few instructions and never across an `.await`.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};
use typist_agent::application::typist::{SinkError, Typist};
use typist_core::{encode, KeyName, Keystroke};

use crate::domain::messages::{CommandResponse, KeypressRequest, StatusResponse, TypeRequest};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Error type for control requests.  Each variant maps to an HTTP status.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("No text provided")]
    MissingText,

    #[error("No key provided")]
    MissingKey,

    #[error("invalid delay {0}: must be a non-negative number of seconds")]
    InvalidDelay(f64),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("{0}")]
    Typing(#[from] SinkError),
}

impl ControlError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ControlError::Typing(_) => 500,
            _ => 400,
        }
    }
}

// ── Server state ──────────────────────────────────────────────────────────────

/// Counters reported by `GET /status`.
#[derive(Debug, Clone)]
pub struct ServerState {
    started: Instant,
    commands_executed: u64,
    last_command_time: Option<f64>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            commands_executed: 0,
            last_command_time: None,
        }
    }

    /// Counts one executed command at the current wall-clock time.
    pub fn record_command(&mut self) {
        self.commands_executed += 1;
        self.last_command_time = Some(unix_now());
    }

    pub fn commands_executed(&self) -> u64 {
        self.commands_executed
    }

    pub fn status(&self) -> StatusResponse {
        let uptime = self.started.elapsed();
        StatusResponse {
            status: "online".to_string(),
            uptime: uptime.as_secs_f64(),
            uptime_formatted: format_uptime(uptime),
            commands_executed: self.commands_executed,
            last_command_time: self.last_command_time,
        }
    }
}

/// Formats an uptime as `"{h}h {m}m {s}s"`, truncating fractional seconds.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Resolves a `/keypress` key.
///
/// Named keys (`enter`, `tab`, ...) come first, then single characters via
/// the key encoder, then numeric Usage IDs.  So `"1"` types the digit one
/// rather than sending Usage ID 1.
pub fn resolve_key(key: &str) -> Option<Keystroke> {
    let name = KeyName::parse(key);
    if let KeyName::Named(_) = name {
        return name.keystroke();
    }
    let mut chars = key.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        let keystroke = encode(c);
        return (keystroke != Keystroke::NO_EVENT).then_some(keystroke);
    }
    name.keystroke()
}

// ── Service ───────────────────────────────────────────────────────────────────

/// Handles the three control endpoints.
pub struct ControlService {
    typist: tokio::sync::Mutex<Typist>,
    state: Mutex<ServerState>,
    default_type_delay: Duration,
}

impl ControlService {
    pub fn new(typist: Typist, default_type_delay: Duration) -> Self {
        Self {
            typist: tokio::sync::Mutex::new(typist),
            state: Mutex::new(ServerState::new()),
            default_type_delay,
        }
    }

    pub fn status(&self) -> StatusResponse {
        self.state().status()
    }

    /// Types the request's text.
    ///
    /// The command counts as executed once it reached the device, whether or
    /// not every character was written.
    ///
    /// # Errors
    ///
    /// [`ControlError::MissingText`] and [`ControlError::InvalidDelay`] for a
    /// bad request; [`ControlError::Typing`] if a HID write fails.
    pub async fn type_text(&self, request: TypeRequest) -> Result<CommandResponse, ControlError> {
        let text = request.text.ok_or(ControlError::MissingText)?;
        let delay = match request.delay {
            None => self.default_type_delay,
            Some(secs) => {
                Duration::try_from_secs_f64(secs).map_err(|_| ControlError::InvalidDelay(secs))?
            }
        };
        info!(length = text.chars().count(), ?delay, "type request");

        let result = self.typist.lock().await.type_text(&text, delay).await;
        self.state().record_command();
        result?;
        Ok(CommandResponse::ok())
    }

    /// Presses one key.  An unknown key is a logged no-op that still counts
    /// as a command.
    ///
    /// # Errors
    ///
    /// [`ControlError::MissingKey`] for a bad request;
    /// [`ControlError::Typing`] if the HID write fails.
    pub async fn press_key(&self, request: KeypressRequest) -> Result<CommandResponse, ControlError> {
        let key = request.key.ok_or(ControlError::MissingKey)?;
        info!(key = %key, "keypress request");

        let result = match resolve_key(&key) {
            Some(keystroke) => self.typist.lock().await.press_keystroke(keystroke).await,
            None => {
                warn!(key = %key, "unknown key, ignoring");
                Ok(())
            }
        };
        self.state().record_command();
        result?;
        Ok(CommandResponse::ok())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
