//! Entry transformation: the rewrites applied to a fetched row before typing.
//!
//! Two fixed rules run in [`EntryTransformer::transform`]:
//!
//! 1. **Timestamp split** – the sheet's `Timestamp` column (e.g.
//!    `"03/14/2024 13:05:00"`) is replaced, at the same position, by a `Date`
//!    (`"2024-03-14"`) and a `Time` (`"13:05:00"`) field.  A value that does
//!    not parse yields two empty strings; the row is still typed.
//!
//! 2. **Composite split** – the `Vehicle Type` column carries the vehicle and
//!    its tariff in one cell (`"RMC TRUCK 250"`).  When the last
//!    whitespace-separated token is all digits it moves into a `Cost` field
//!    inserted just before `Vehicle Type`.
//!
//! A third, display-only rule lives in [`FieldMappings`]: per-field value
//! substitutions applied when a field is typed.  It is kept out of
//! `transform` so that dedup identifiers use unmapped values and every field
//! other than the two above passes through untouched.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::row::Row;

/// Field names and formats used by the two fixed rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransformRules {
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,
    /// `chrono` format of the incoming timestamp.
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
    #[serde(default = "default_date_field")]
    pub date_field: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_time_field")]
    pub time_field: String,
    #[serde(default = "default_time_format")]
    pub time_format: String,
    /// Column holding "vehicle type + cost".
    #[serde(default = "default_composite_field")]
    pub composite_field: String,
    #[serde(default = "default_cost_field")]
    pub cost_field: String,
}

fn default_timestamp_field() -> String {
    "Timestamp".to_string()
}
fn default_timestamp_format() -> String {
    "%m/%d/%Y %H:%M:%S".to_string()
}
fn default_date_field() -> String {
    "Date".to_string()
}
fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}
fn default_time_field() -> String {
    "Time".to_string()
}
fn default_time_format() -> String {
    "%H:%M:%S".to_string()
}
fn default_composite_field() -> String {
    "Vehicle Type".to_string()
}
fn default_cost_field() -> String {
    "Cost".to_string()
}

impl Default for TransformRules {
    fn default() -> Self {
        Self {
            timestamp_field: default_timestamp_field(),
            timestamp_format: default_timestamp_format(),
            date_field: default_date_field(),
            date_format: default_date_format(),
            time_field: default_time_field(),
            time_format: default_time_format(),
            composite_field: default_composite_field(),
            cost_field: default_cost_field(),
        }
    }
}

/// Per-field display substitutions: field → (sheet value → typed value).
///
/// ```toml
/// [entry.field_mappings."Loaded"]
/// y = "YES"
/// yes = "YES"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldMappings(BTreeMap<String, BTreeMap<String, String>>);

impl FieldMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a substitution for `field`.
    pub fn with(mut self, field: &str, from: &str, to: &str) -> Self {
        self.0
            .entry(field.to_string())
            .or_default()
            .insert(from.to_string(), to.to_string());
        self
    }

    /// Returns the mapped value, or `value` unchanged when no mapping exists.
    pub fn apply<'a>(&'a self, field: &str, value: &'a str) -> &'a str {
        match self.0.get(field).and_then(|table| table.get(value)) {
            Some(mapped) => {
                debug!(field, from = value, to = %mapped, "applied field mapping");
                mapped.as_str()
            }
            None => value,
        }
    }
}

/// Splits `"RMC TRUCK 250"` into `("250", "RMC TRUCK")`.
///
/// When the last token is not purely ASCII digits the cost is empty and the
/// original value is returned as-is (whitespace included).
pub fn split_composite(value: &str) -> (String, String) {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    match tokens.split_last() {
        Some((last, rest)) if last.chars().all(|c| c.is_ascii_digit()) => {
            (last.to_string(), rest.join(" "))
        }
        _ => (String::new(), value.to_string()),
    }
}

/// Applies [`TransformRules`] to rows and [`FieldMappings`] to typed values.
#[derive(Debug, Clone, Default)]
pub struct EntryTransformer {
    rules: TransformRules,
    mappings: FieldMappings,
}

impl EntryTransformer {
    pub fn new(rules: TransformRules, mappings: FieldMappings) -> Self {
        Self { rules, mappings }
    }

    pub fn rules(&self) -> &TransformRules {
        &self.rules
    }

    /// Rewrites `row` into the row that will be typed.  Pure and deterministic.
    ///
    /// A `Date`, `Time` or `Cost` column already in the sheet is overwritten
    /// by the derived value.
    pub fn transform(&self, row: &Row) -> Row {
        self.apply(row, true)
    }

    /// The fields a row shaped like `header_row` carries after
    /// [`transform`](Self::transform).  Values are not parsed.
    pub fn shape(&self, header_row: &Row) -> Row {
        self.apply(header_row, false)
    }

    /// Value to type for `field`, after display mappings.
    pub fn display_value<'a>(&'a self, field: &str, value: &'a str) -> &'a str {
        self.mappings.apply(field, value)
    }

    fn apply(&self, row: &Row, parse: bool) -> Row {
        let mut out = row.clone();
        self.split_timestamp(&mut out, parse);
        self.split_vehicle(&mut out);
        out
    }

    fn split_timestamp(&self, row: &mut Row, parse: bool) {
        let r = &self.rules;
        let Some(index) = row.index_of(&r.timestamp_field) else {
            return;
        };
        let raw = row.remove(&r.timestamp_field).unwrap_or_default();

        let (date, time) = if parse {
            match NaiveDateTime::parse_from_str(&raw, &r.timestamp_format) {
                Ok(dt) => (
                    dt.format(&r.date_format).to_string(),
                    dt.format(&r.time_format).to_string(),
                ),
                Err(e) => {
                    warn!(timestamp = %raw, "could not parse timestamp: {e}");
                    (String::new(), String::new())
                }
            }
        } else {
            (String::new(), String::new())
        };

        row.insert_at(index, &r.date_field, date);
        if let Some(date_index) = row.index_of(&r.date_field) {
            row.insert_at(date_index + 1, &r.time_field, time);
        }
    }

    fn split_vehicle(&self, row: &mut Row) {
        let r = &self.rules;
        let Some(value) = row.get(&r.composite_field) else {
            return;
        };
        let (cost, vehicle) = split_composite(value);
        row.insert(r.composite_field.as_str(), vehicle);
        if let Some(index) = row.index_of(&r.composite_field) {
            row.insert_at(index, &r.cost_field, cost);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().copied().collect()
    }

    fn transformer() -> EntryTransformer {
        EntryTransformer::default()
    }

    // ── Timestamp split ───────────────────────────────────────────────────────

    #[test]
    fn test_timestamp_is_split_into_date_and_time() {
        // Arrange
        let input = row(&[("Timestamp", "03/14/2024 13:05:00")]);

        // Act
        let out = transformer().transform(&input);

        // Assert
        assert_eq!(out.get("Date"), Some("2024-03-14"));
        assert_eq!(out.get("Time"), Some("13:05:00"));
        assert!(!out.contains("Timestamp"));
    }

    #[test]
    fn test_unparseable_timestamp_yields_empty_date_and_time() {
        let out = transformer().transform(&row(&[("Timestamp", "not-a-date")]));
        assert_eq!(out.get("Date"), Some(""));
        assert_eq!(out.get("Time"), Some(""));
    }

    #[test]
    fn test_date_and_time_take_the_timestamp_position() {
        let input = row(&[("Party", "ACME"), ("Timestamp", "03/14/2024 13:05:00"), ("Material", "Sand")]);
        let out = transformer().transform(&input);
        let names: Vec<&str> = out.field_names().collect();
        assert_eq!(names, vec!["Party", "Date", "Time", "Material"]);
    }

    #[test]
    fn test_custom_timestamp_format_is_honoured() {
        let rules = TransformRules {
            timestamp_format: "%d.%m.%Y,%H:%M".to_string(),
            ..TransformRules::default()
        };
        let t = EntryTransformer::new(rules, FieldMappings::new());
        let out = t.transform(&row(&[("Timestamp", "14.03.2024,13:05")]));
        assert_eq!(out.get("Date"), Some("2024-03-14"));
        assert_eq!(out.get("Time"), Some("13:05:00"));
    }

    #[test]
    fn test_existing_date_column_is_overwritten() {
        // Arrange
        let input = row(&[("Date", "old"), ("Timestamp", "03/14/2024 13:05:00")]);

        // Act
        let out = transformer().transform(&input);

        // Assert
        let names: Vec<&str> = out.field_names().collect();
        assert_eq!(names, vec!["Date", "Time"]);
        assert_eq!(out.get("Date"), Some("2024-03-14"));
        assert_eq!(out.get("Time"), Some("13:05:00"));
    }

    #[test]
    fn test_existing_time_column_is_overwritten() {
        let input = row(&[("Time", "old"), ("Timestamp", "03/14/2024 13:05:00")]);
        let out = transformer().transform(&input);
        let names: Vec<&str> = out.field_names().collect();
        assert_eq!(names, vec!["Date", "Time"]);
        assert_eq!(out.get("Time"), Some("13:05:00"));
    }

    #[test]
    fn test_existing_date_and_time_after_timestamp_are_overwritten() {
        let input = row(&[
            ("Timestamp", "03/14/2024 13:05:00"),
            ("Material", "Sand"),
            ("Time", "old"),
            ("Date", "old"),
        ]);
        let out = transformer().transform(&input);
        let names: Vec<&str> = out.field_names().collect();
        assert_eq!(names, vec!["Date", "Time", "Material"]);
        assert_eq!(out.get("Date"), Some("2024-03-14"));
    }

    #[test]
    fn test_shape_lists_derived_fields() {
        let header: Row = row(&[("Timestamp", ""), ("Vehicle Type", "")]);
        let names: Vec<String> = transformer()
            .shape(&header)
            .field_names()
            .map(str::to_string)
            .collect();
        assert_eq!(names, vec!["Date", "Time", "Cost", "Vehicle Type"]);
    }

    // ── Composite split ───────────────────────────────────────────────────────

    #[test]
    fn test_vehicle_with_trailing_number_is_split() {
        let out = transformer().transform(&row(&[("Vehicle Type", "RMC TRUCK 250")]));
        assert_eq!(out.get("Vehicle Type"), Some("RMC TRUCK"));
        assert_eq!(out.get("Cost"), Some("250"));
    }

    #[test]
    fn test_vehicle_without_number_passes_through() {
        let out = transformer().transform(&row(&[("Vehicle Type", "FLATBED")]));
        assert_eq!(out.get("Vehicle Type"), Some("FLATBED"));
        assert_eq!(out.get("Cost"), Some(""));
    }

    #[test]
    fn test_split_composite_rejoins_with_single_spaces() {
        assert_eq!(
            split_composite("RMC   TRUCK\t250"),
            ("250".to_string(), "RMC TRUCK".to_string())
        );
    }

    #[test]
    fn test_split_composite_keeps_original_text_when_no_cost() {
        assert_eq!(
            split_composite("  TIPPER  12T "),
            (String::new(), "  TIPPER  12T ".to_string())
        );
    }

    #[test]
    fn test_split_composite_on_empty_value() {
        assert_eq!(split_composite(""), (String::new(), String::new()));
    }

    #[test]
    fn test_cost_is_inserted_before_vehicle_type() {
        let input = row(&[("Vehicle Type", "RMC TRUCK 250"), ("Material", "Sand")]);
        let out = transformer().transform(&input);
        let names: Vec<&str> = out.field_names().collect();
        assert_eq!(names, vec!["Cost", "Vehicle Type", "Material"]);
    }

    #[test]
    fn test_existing_cost_column_is_overwritten() {
        // Arrange
        let input = row(&[("Cost", "999"), ("Vehicle Type", "RMC TRUCK 250")]);

        // Act
        let out = transformer().transform(&input);

        // Assert
        let names: Vec<&str> = out.field_names().collect();
        assert_eq!(names, vec!["Cost", "Vehicle Type"]);
        assert_eq!(out.get("Cost"), Some("250"));
    }

    #[test]
    fn test_cost_column_after_vehicle_type_moves_before_it() {
        let input = row(&[("Vehicle Type", "RMC TRUCK 250"), ("Cost", "999"), ("Material", "Sand")]);
        let out = transformer().transform(&input);
        let names: Vec<&str> = out.field_names().collect();
        assert_eq!(names, vec!["Cost", "Vehicle Type", "Material"]);
        assert_eq!(out.get("Cost"), Some("250"));
    }

    // ── Untouched fields ──────────────────────────────────────────────────────

    #[test]
    fn test_other_fields_are_unchanged() {
        // Arrange
        let input = row(&[
            ("Timestamp", "03/14/2024 13:05:00"),
            ("Vehicle Type", "RMC TRUCK 250"),
            ("Material", "Sand"),
            ("Party Ref:", "  P-77 "),
            ("Loaded", "y"),
        ]);

        // Act
        let out = transformer().transform(&input);

        // Assert
        for (field, value) in input.iter() {
            if field == "Timestamp" || field == "Vehicle Type" {
                continue;
            }
            assert_eq!(out.get(field), Some(value), "{field} must pass through");
        }
    }

    #[test]
    fn test_transform_is_deterministic() {
        let input = row(&[("Timestamp", "03/14/2024 13:05:00"), ("Vehicle Type", "RMC 9")]);
        let t = transformer();
        assert_eq!(t.transform(&input), t.transform(&input));
    }

    #[test]
    fn test_row_without_special_fields_is_identical() {
        let input = row(&[("Material", "Sand"), ("Weight", "12000")]);
        assert_eq!(transformer().transform(&input), input);
    }

    // ── Field mappings ────────────────────────────────────────────────────────

    #[test]
    fn test_mapping_substitutes_configured_values() {
        let mappings = FieldMappings::new().with("Loaded", "y", "YES").with("Loaded", "yes", "YES");
        let t = EntryTransformer::new(TransformRules::default(), mappings);
        assert_eq!(t.display_value("Loaded", "y"), "YES");
        assert_eq!(t.display_value("Loaded", "yes"), "YES");
    }

    #[test]
    fn test_unmapped_values_pass_through() {
        let mappings = FieldMappings::new().with("Loaded", "y", "YES");
        let t = EntryTransformer::new(TransformRules::default(), mappings);
        assert_eq!(t.display_value("Loaded", "n"), "n");
        assert_eq!(t.display_value("Material", "y"), "y");
    }

    #[test]
    fn test_mappings_deserialize_from_toml_tables() {
        let toml_str = r#"
[Loaded]
y = "YES"
n = "NO"
"#;
        let mappings: FieldMappings = toml::from_str(toml_str).expect("deserialize");
        assert_eq!(mappings.apply("Loaded", "n"), "NO");
    }
}
