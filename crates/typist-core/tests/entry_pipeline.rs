//! Integration tests for the typist-core row pipeline.
//!
//! These tests drive a raw sheet grid through the public API the same way the
//! agent does: build a snapshot, transform each row, derive its dedup id from
//! the transformed fields, then encode its typed values into HID reports.

use typist_core::{
    encode, report::RELEASE_REPORT, EntryId, EntryTransformer, FieldMappings, KeyboardReport,
    SheetSnapshot, TransformRules,
};

fn grid(lines: &[&[&str]]) -> Vec<Vec<String>> {
    lines
        .iter()
        .map(|l| l.iter().map(|s| s.to_string()).collect())
        .collect()
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ── Snapshot → transform → id ─────────────────────────────────────────────────

#[test]
fn test_weighbridge_row_is_transformed_and_identified() {
    // Arrange
    let snapshot = SheetSnapshot::from_grid(grid(&[
        &["Timestamp", "Vehicle Type", "Material"],
        &["03/14/2024 13:05:00", "RMC TRUCK 250", "Sand"],
    ]));
    let transformer = EntryTransformer::default();
    let id_fields = names(&["Date", "Time", "Material"]);

    // Act
    let typed = transformer.transform(&snapshot.rows[0]);
    let id = EntryId::derive(&typed, &id_fields);

    // Assert
    assert_eq!(id.as_str(), "2024-03-14|13:05:00|Sand");
    assert_eq!(typed.get("Date"), Some("2024-03-14"));
    assert_eq!(typed.get("Time"), Some("13:05:00"));
    assert_eq!(typed.get("Material"), Some("Sand"));
    assert_eq!(typed.get("Cost"), Some("250"));
    assert_eq!(typed.get("Vehicle Type"), Some("RMC TRUCK"));
    assert!(!typed.contains("Timestamp"));
}

#[test]
fn test_field_order_after_transformation() {
    let snapshot = SheetSnapshot::from_grid(grid(&[
        &["Timestamp", "Vehicle Type", "Material", "Party Ref:"],
        &["03/14/2024 13:05:00", "RMC TRUCK 250", "Sand", "P-77"],
    ]));
    let typed = EntryTransformer::default().transform(&snapshot.rows[0]);
    let names: Vec<&str> = typed.field_names().collect();
    assert_eq!(
        names,
        vec!["Date", "Time", "Cost", "Vehicle Type", "Material", "Party Ref:"]
    );
}

#[test]
fn test_same_raw_row_fetched_twice_gives_same_id() {
    let raw = grid(&[
        &["Timestamp", "Vehicle Type", "Material"],
        &["03/14/2024 13:05:00", "RMC TRUCK 250", "Sand"],
    ]);
    let transformer = EntryTransformer::default();
    let id_fields = names(&["Date", "Time", "Material"]);

    let first = SheetSnapshot::from_grid(raw.clone());
    let second = SheetSnapshot::from_grid(raw);

    assert_eq!(
        EntryId::derive(&transformer.transform(&first.rows[0]), &id_fields),
        EntryId::derive(&transformer.transform(&second.rows[0]), &id_fields)
    );
}

#[test]
fn test_short_sheet_row_still_transforms() {
    let snapshot = SheetSnapshot::from_grid(grid(&[
        &["Timestamp", "Vehicle Type", "Material"],
        &["03/14/2024 13:05:00"],
    ]));
    let typed = EntryTransformer::default().transform(&snapshot.rows[0]);
    assert_eq!(typed.get("Date"), Some("2024-03-14"));
    assert_eq!(typed.get("Cost"), Some(""));
    assert_eq!(typed.get("Vehicle Type"), Some(""));
    assert_eq!(typed.get("Material"), Some(""));
}

// ── Typed values → reports ────────────────────────────────────────────────────

#[test]
fn test_mapped_value_encodes_to_shifted_reports() {
    // Arrange
    let transformer = EntryTransformer::new(
        TransformRules::default(),
        FieldMappings::new().with("Loaded", "y", "YES"),
    );

    // Act
    let reports: Vec<[u8; 8]> = transformer
        .display_value("Loaded", "y")
        .chars()
        .flat_map(|c| [KeyboardReport::press(encode(c)).to_bytes(), RELEASE_REPORT])
        .collect();

    // Assert: Y=0x1C, E=0x08, S=0x16, each with Right Shift and a release.
    assert_eq!(reports.len(), 6);
    assert_eq!(reports[0], [0x20, 0, 0x1C, 0, 0, 0, 0, 0]);
    assert_eq!(reports[2], [0x20, 0, 0x08, 0, 0, 0, 0, 0]);
    assert_eq!(reports[4], [0x20, 0, 0x16, 0, 0, 0, 0, 0]);
    assert!(reports.iter().skip(1).step_by(2).all(|r| *r == RELEASE_REPORT));
}

#[test]
fn test_unsupported_character_encodes_to_no_event_report() {
    let bytes = KeyboardReport::press(encode('€')).to_bytes();
    assert_eq!(bytes, RELEASE_REPORT);
}
