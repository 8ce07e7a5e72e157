//! CSV ledger of processed entry identifiers.
//!
//! ```text
//! Timestamp,UniqueID
//! 2024-03-14 13:06:12,2024-03-14|13:05:00|Sand
//! 2024-03-14 13:21:40,"2024-03-14|13:20:00|Sand, washed"
//! ```
//!
//! The first column is the local time the entry was typed; the second is its
//! [`EntryId`].  The file is only ever appended to.  Identifiers are quoted by
//! the `csv` writer when they contain commas or quotes, so any field value is
//! safe in an identifier.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info};
use typist_core::EntryId;

use crate::application::ports::{EntryLedger, LedgerError, LedgerSnapshot};

/// Header row written when the ledger is created.
pub const LEDGER_HEADER: [&str; 2] = ["Timestamp", "UniqueID"];

/// Format of the processing timestamp column.
pub const LEDGER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// File-backed [`EntryLedger`].
#[derive(Debug, Clone)]
pub struct CsvLedger {
    path: PathBuf,
    read_only: bool,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: false,
        }
    }

    /// A ledger that reads the file but never creates or appends to it.
    /// Used by `--dry-run` so a rehearsal does not mark entries as done.
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file with only the header row if it does not exist yet.
    fn ensure_exists(&self) -> Result<bool, LedgerError> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| LedgerError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let mut writer = csv::Writer::from_path(&self.path).map_err(|e| self.csv_error(e))?;
        writer
            .write_record(LEDGER_HEADER)
            .map_err(|e| self.csv_error(e))?;
        writer.flush().map_err(|source| self.io_error(source))?;
        info!(ledger = %self.path.display(), "created new ledger");
        Ok(true)
    }

    fn io_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, e: csv::Error) -> LedgerError {
        let message = e.to_string();
        match e.into_kind() {
            csv::ErrorKind::Io(source) => self.io_error(source),
            _ => LedgerError::Format {
                path: self.path.clone(),
                message,
            },
        }
    }
}

impl EntryLedger for CsvLedger {
    fn load(&self) -> Result<LedgerSnapshot, LedgerError> {
        if self.read_only && !self.path.exists() {
            return Ok(LedgerSnapshot::default());
        }
        if !self.read_only && self.ensure_exists()? {
            return Ok(LedgerSnapshot::default());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.csv_error(e))?;

        let mut ids = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| self.csv_error(e))?;
            if let Some(id) = record.get(1) {
                ids.push(EntryId::from(id));
            }
        }
        debug!(count = ids.len(), ledger = %self.path.display(), "loaded ledger");
        Ok(ids.into_iter().collect())
    }

    fn append(&self, id: &EntryId) -> Result<(), LedgerError> {
        if self.read_only {
            info!(%id, "dry run, not recording entry");
            return Ok(());
        }
        self.ensure_exists()?;

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        let mut writer = csv::Writer::from_writer(file);
        let now = Local::now().format(LEDGER_TIME_FORMAT).to_string();
        writer
            .write_record([now.as_str(), id.as_str()])
            .map_err(|e| self.csv_error(e))?;
        writer.flush().map_err(|source| self.io_error(source))?;

        info!(%id, "recorded entry as processed");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
