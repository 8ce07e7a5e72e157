use std::fmt;

use serde::{Deserialize, Serialize};

use super::row::Row;

/// Separator placed between identifying field values.
pub const ID_DELIMITER: char = '|';

/// Dedup key of a row: the configured identifying fields joined with `|`.
///
/// Derived from the transformed row, so identifier fields may name derived
/// columns such as `Date` and `Time`.  Field mappings are not applied; the
/// same sheet line always produces the same id across polls and restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Builds the id from `fields` of `row`.  Missing fields contribute an
    /// empty segment, so the number of delimiters is always `fields.len() - 1`.
    pub fn derive(row: &Row, fields: &[String]) -> Self {
        let parts: Vec<&str> = fields
            .iter()
            .map(|f| row.get(f).unwrap_or(""))
            .collect();
        EntryId(parts.join(&ID_DELIMITER.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        EntryId(s)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        EntryId(s.to_string())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
