//! TOML configuration for the agent.
//!
//! # Example (for beginners)
//!
//! ```toml
//! [sheet]
//! spreadsheet_id = "1AbC..."
//! sheet_name = "Form Responses 1"
//! api_key = "AIza..."          # or set TYPIST_API_KEY
//!
//! [ledger]
//! path = "/var/lib/typist/processed_entries.csv"
//!
//! [timing]                      # seconds
//! type_delay = 0.05
//! field_delay = 0.5
//! entry_delay = 2.0
//! initial_delay = 3.0
//! check_interval = 60.0
//!
//! [entry]
//! fields_to_type = ["Date", "Time", "Vehicle Type", "Cost", "Material"]
//! id_fields = ["Date", "Time", "Material"]
//! between_fields_key = "tab"
//! end_entry_keys = [{ key = "enter", times = 2 }]
//!
//! [entry.field_mappings."Loaded"]
//! y = "YES"
//! ```
//!
//! Every field has a serde default, so a file only needs the values that
//! differ.  `spreadsheet_id` and `api_key` have no useful default and are
//! rejected by [`AgentConfig::validate`] when empty.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use typist_core::{EntryTransformer, FieldMappings, TransformRules};

use crate::application::automation::{EndKey, EntryPlan, Pacing};
use crate::infrastructure::hid_gadget::DEFAULT_HID_DEVICE;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range or missing.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub entry: EntryConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote spreadsheet location and credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetConfig {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    /// A1-notation range within the sheet.
    #[serde(default = "default_range")]
    pub range: String,
    #[serde(default)]
    pub api_key: String,
    /// Scheme and host of the Sheets API.  Overridden in tests.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Seconds before a fetch is abandoned.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: f64,
}

/// Processed-entry ledger location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

/// Delays, all in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    /// After each typed character.
    #[serde(default = "default_type_delay")]
    pub type_delay: f64,
    /// After each field.
    #[serde(default = "default_field_delay")]
    pub field_delay: f64,
    /// Between consecutive entries.
    #[serde(default = "default_entry_delay")]
    pub entry_delay: f64,
    /// Before each entry, to let the operator focus the terminal.
    #[serde(default = "default_initial_delay")]
    pub initial_delay: f64,
    /// Between polls.
    #[serde(default = "default_check_interval")]
    pub check_interval: f64,
    /// After each named key press.
    #[serde(default = "default_key_press_delay")]
    pub key_press_delay: f64,
}

/// What gets typed and how entries are identified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryConfig {
    #[serde(default = "default_fields_to_type")]
    pub fields_to_type: Vec<String>,
    #[serde(default = "default_id_fields")]
    pub id_fields: Vec<String>,
    #[serde(default = "default_between_fields_key")]
    pub between_fields_key: String,
    #[serde(default = "default_end_entry_keys")]
    pub end_entry_keys: Vec<EndKey>,
    #[serde(default)]
    pub field_mappings: FieldMappings,
    #[serde(default)]
    pub transform: TransformRules,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    #[serde(default = "default_hid_device")]
    pub hid_device: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Plain-text copy of the log.  Omit to log to stdout only.
    #[serde(default = "default_log_file", skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_sheet_name() -> String {
    "Sheet1".to_string()
}
fn default_range() -> String {
    "A1:Z".to_string()
}
fn default_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}
fn default_request_timeout() -> f64 {
    30.0
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from("processed_entries.csv")
}
fn default_type_delay() -> f64 {
    0.05
}
fn default_field_delay() -> f64 {
    0.5
}
fn default_entry_delay() -> f64 {
    2.0
}
fn default_initial_delay() -> f64 {
    3.0
}
fn default_check_interval() -> f64 {
    60.0
}
fn default_key_press_delay() -> f64 {
    0.1
}
fn default_fields_to_type() -> Vec<String> {
    ["Date", "Time", "Vehicle Type", "Cost", "Material", "Party Ref:"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_id_fields() -> Vec<String> {
    ["Date", "Time", "Vehicle Type", "Material", "Party Ref:"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_between_fields_key() -> String {
    "tab".to_string()
}
fn default_end_entry_keys() -> Vec<EndKey> {
    vec![EndKey {
        key: "enter".to_string(),
        times: 1,
    }]
}
fn default_hid_device() -> PathBuf {
    PathBuf::from(DEFAULT_HID_DEVICE)
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("typist-agent.log"))
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            sheet_name: default_sheet_name(),
            range: default_range(),
            api_key: String::new(),
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            type_delay: default_type_delay(),
            field_delay: default_field_delay(),
            entry_delay: default_entry_delay(),
            initial_delay: default_initial_delay(),
            check_interval: default_check_interval(),
            key_press_delay: default_key_press_delay(),
        }
    }
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            fields_to_type: default_fields_to_type(),
            id_fields: default_id_fields(),
            between_fields_key: default_between_fields_key(),
            end_entry_keys: default_end_entry_keys(),
            field_mappings: FieldMappings::default(),
            transform: TransformRules::default(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            hid_device: default_hid_device(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: default_log_file(),
        }
    }
}

// ── Loading and derived values ────────────────────────────────────────────────

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl AgentConfig {
    /// Loads the config at `path`, returning defaults if the file does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] for file-system errors other than "not
    /// found", and [`ConfigError::Parse`] if the TOML is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Writes the config to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] on file-system errors and
    /// [`ConfigError::Serialize`] if the config cannot be rendered.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rejects configurations the agent cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sheet.spreadsheet_id.trim().is_empty() {
            return Err(ConfigError::Invalid("sheet.spreadsheet_id is empty".into()));
        }
        if self.sheet.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "sheet.api_key is empty (set it in the file or TYPIST_API_KEY)".into(),
            ));
        }
        if self.sheet.sheet_name.trim().is_empty() {
            return Err(ConfigError::Invalid("sheet.sheet_name is empty".into()));
        }

        let t = &self.timing;
        let delays = [
            ("timing.type_delay", t.type_delay),
            ("timing.field_delay", t.field_delay),
            ("timing.entry_delay", t.entry_delay),
            ("timing.initial_delay", t.initial_delay),
            ("timing.check_interval", t.check_interval),
            ("timing.key_press_delay", t.key_press_delay),
            ("sheet.request_timeout", self.sheet.request_timeout),
        ];
        for (name, value) in delays {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        if self.sheet.request_timeout == 0.0 {
            return Err(ConfigError::Invalid("sheet.request_timeout must be positive".into()));
        }

        if self.entry.id_fields.is_empty() {
            return Err(ConfigError::Invalid("entry.id_fields is empty".into()));
        }
        if self.entry.fields_to_type.is_empty() {
            return Err(ConfigError::Invalid("entry.fields_to_type is empty".into()));
        }
        Ok(())
    }

    pub fn pacing(&self) -> Pacing {
        let t = &self.timing;
        Pacing {
            type_delay: seconds(t.type_delay),
            field_delay: seconds(t.field_delay),
            entry_delay: seconds(t.entry_delay),
            initial_delay: seconds(t.initial_delay),
            check_interval: seconds(t.check_interval),
        }
    }

    pub fn key_press_delay(&self) -> Duration {
        seconds(self.timing.key_press_delay)
    }

    pub fn request_timeout(&self) -> Duration {
        seconds(self.sheet.request_timeout)
    }

    pub fn plan(&self) -> EntryPlan {
        EntryPlan {
            fields_to_type: self.entry.fields_to_type.clone(),
            id_fields: self.entry.id_fields.clone(),
            between_fields_key: self.entry.between_fields_key.clone(),
            end_entry_keys: self.entry.end_entry_keys.clone(),
        }
    }

    pub fn transformer(&self) -> EntryTransformer {
        EntryTransformer::new(self.entry.transform.clone(), self.entry.field_mappings.clone())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
