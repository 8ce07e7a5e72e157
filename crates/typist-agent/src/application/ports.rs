//! Traits the application layer depends on.
//!
//! The polling loop never talks to HTTP, files, or the clock directly.  It
//! holds `Arc<dyn ...>` handles to the traits below, and `main.rs` wires in
//! the infrastructure implementations.  Tests wire in fakes.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use typist_core::{EntryId, SheetSnapshot};

// ── Row source ────────────────────────────────────────────────────────────────

/// Error type for fetching rows from the remote sheet.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request could not be sent or timed out.
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("sheet returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the expected JSON shape.
    #[error("unexpected response body: {0}")]
    Parse(String),
}

/// Source of spreadsheet rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Fetches the full current contents of the configured range.
    async fn fetch_rows(&self) -> Result<SheetSnapshot, SourceError>;
}

// ── Ledger ────────────────────────────────────────────────────────────────────

/// Error type for ledger reads and appends.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("I/O error accessing ledger at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed ledger at {path}: {message}")]
    Format { path: PathBuf, message: String },
}

/// Identifiers already processed, as of one load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot(HashSet<EntryId>);

impl LedgerSnapshot {
    pub fn contains(&self, id: &EntryId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<EntryId> for LedgerSnapshot {
    fn from_iter<I: IntoIterator<Item = EntryId>>(iter: I) -> Self {
        LedgerSnapshot(iter.into_iter().collect())
    }
}

/// Durable append-only record of processed identifiers.
///
/// Single writer.  `load` is called once per polling pass.
pub trait EntryLedger: Send + Sync {
    /// Reads every recorded identifier, creating empty storage on first use.
    fn load(&self) -> Result<LedgerSnapshot, LedgerError>;

    /// Records `id` as processed.
    fn append(&self, id: &EntryId) -> Result<(), LedgerError>;
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Every suspension in the typing and polling paths goes through this trait.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
