//! Google Sheets v4 values client.
//!
//! # Request shape (for beginners)
//!
//! A sheet shared as "anyone with the link can view" can be read with a plain
//! API key, no OAuth:
//!
//! ```text
//! GET https://sheets.googleapis.com/v4/spreadsheets/{id}/values/{sheet}!A1:Z?alt=json&key={api_key}
//!
//! { "range": "Sheet1!A1:Z1000",
//!   "majorDimension": "ROWS",
//!   "values": [["Timestamp", "Vehicle Type", ...], ["03/14/2024 13:05:00", ...]] }
//! ```
//!
//! Trailing empty cells are omitted by the API, so data lines can be shorter
//! than the header.  [`SheetSnapshot::from_grid`] pads them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info};
use typist_core::SheetSnapshot;

use crate::application::ports::{RowSource, SourceError};
use crate::infrastructure::config::SheetConfig;

/// Longest error body kept in [`SourceError::Status`].
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Reads one range of one sheet.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    client: Client,
    url: Url,
}

impl SheetsClient {
    /// Builds a client for the sheet described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Request`] if the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: &SheetConfig, api_key: &str, timeout: Duration) -> Result<Self, SourceError> {
        let url = values_url(config, api_key)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Request(e.to_string()))?;
        info!(
            spreadsheet = %config.spreadsheet_id,
            sheet = %config.sheet_name,
            range = %config.range,
            "sheets client ready"
        );
        Ok(Self { client, url })
    }
}

#[async_trait]
impl RowSource for SheetsClient {
    async fn fetch_rows(&self) -> Result<SheetSnapshot, SourceError> {
        // `without_url` keeps the API key out of logs.
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| SourceError::Request(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Request(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let snapshot = parse_values(&body)?;
        debug!(rows = snapshot.rows.len(), "fetched sheet");
        Ok(snapshot)
    }
}

/// Builds the values URL, percent-encoding the sheet name.
fn values_url(config: &SheetConfig, api_key: &str) -> Result<Url, SourceError> {
    let range = format!("{}!{}", config.sheet_name, config.range);
    let mut url = Url::parse(&config.base_url)
        .map_err(|e| SourceError::Request(format!("invalid base URL {}: {e}", config.base_url)))?;
    url.path_segments_mut()
        .map_err(|()| SourceError::Request(format!("base URL {} cannot hold a path", config.base_url)))?
        .pop_if_empty()
        .extend([
            "v4",
            "spreadsheets",
            config.spreadsheet_id.as_str(),
            "values",
            range.as_str(),
        ]);
    url.query_pairs_mut()
        .append_pair("alt", "json")
        .append_pair("key", api_key);
    Ok(url)
}

/// Parses a values response into a snapshot.  A missing `values` key is an
/// empty sheet.
fn parse_values(body: &str) -> Result<SheetSnapshot, SourceError> {
    let range: ValueRange =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;
    let grid = range
        .values
        .into_iter()
        .map(|line| line.into_iter().map(cell_text).collect())
        .collect();
    Ok(SheetSnapshot::from_grid(grid))
}

fn cell_text(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
