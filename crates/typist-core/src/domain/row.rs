//! Spreadsheet rows as ordered field→value maps.
//!
//! The remote sheet returns a grid of strings whose first line is the header.
//! [`SheetSnapshot::from_grid`] zips every data line against that header so
//! the rest of the pipeline can look fields up by name while still iterating
//! them in column order.

use indexmap::IndexMap;

/// One record: field name → field value, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(IndexMap<String, String>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Sets `field`, keeping its position if it already exists and appending
    /// it otherwise.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    /// Field names in column order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `(field, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn index_of(&self, field: &str) -> Option<usize> {
        self.0.get_index_of(field)
    }

    pub(crate) fn remove(&mut self, field: &str) -> Option<String> {
        self.0.shift_remove(field)
    }

    /// Inserts `field` at `index`, shifting later fields right.
    ///
    /// An existing `field` is moved: `index` counts positions as they were
    /// before the move.
    pub(crate) fn insert_at(&mut self, index: usize, field: &str, value: String) {
        let mut index = index;
        if let Some(existing) = self.0.get_index_of(field) {
            self.0.shift_remove_index(existing);
            if existing < index {
                index -= 1;
            }
        }
        let index = index.min(self.0.len());
        self.0.shift_insert(index, field.to_string(), value);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row(iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect())
    }
}

/// The result of one fetch: the header line plus every data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetSnapshot {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl SheetSnapshot {
    /// Builds rows from a raw grid whose first line is the header.
    ///
    /// Lines shorter than the header are right-padded with empty strings;
    /// cells beyond the header width are dropped.  An empty grid yields an
    /// empty snapshot.
    pub fn from_grid(grid: Vec<Vec<String>>) -> Self {
        let mut lines = grid.into_iter();
        let Some(headers) = lines.next() else {
            return Self::default();
        };

        let rows = lines
            .map(|line| {
                let mut cells = line.into_iter();
                headers
                    .iter()
                    .map(|h| (h.clone(), cells.next().unwrap_or_default()))
                    .collect::<Row>()
            })
            .collect();

        Self { headers, rows }
    }

    /// A row with every header and empty values.  Transforming it yields the
    /// field names the typed rows of this snapshot will carry.
    pub fn header_row(&self) -> Row {
        self.headers.iter().map(|h| (h.as_str(), "")).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
