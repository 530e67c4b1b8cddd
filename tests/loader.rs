use std::collections::BTreeSet;
use std::path::PathBuf;

use gateview::domain::{GateViewError, ViewConfig};
use gateview::loader::{load_data_file, load_data_file_with_id_start, next_free_id};
use gateview::record::{RecordSchema, STATUS_FIELD, StatusClass, Value};
use gateview::view::TableView;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn event_schema() -> RecordSchema {
    RecordSchema {
        id_field: "id".to_string(),
        status_field: Some("status".to_string()),
        timestamp_field: Some("time".to_string()),
    }
}

#[test]
fn loads_events_with_status_and_timestamp() {
    let data = load_data_file(fixture("events.csv"), &event_schema()).unwrap();
    assert_eq!(data.name, "events.csv");
    assert_eq!(data.records.len(), 6);

    let keys: Vec<&str> = data.columns.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["id", "time", "gate", "name", "status"]);

    let carol = &data.records[2];
    assert_eq!(carol.id(), "3");
    assert_eq!(carol.status(), StatusClass::Error);
    assert_eq!(carol.timestamp(), Some(1_700_000_120));
    assert_eq!(carol.value("gate"), &Value::text("North"));
    assert_eq!(carol.value(STATUS_FIELD), &Value::text("error"));
}

#[test]
fn generates_ids_when_the_id_column_is_missing() {
    let data = load_data_file(fixture("people.csv"), &RecordSchema::default()).unwrap();
    let ids: Vec<&str> = data.records.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(data.columns[0].key, "id");
    assert!(data.records.iter().all(|r| r.status() == StatusClass::Normal));
}

#[test]
fn blank_id_is_rejected() {
    let err = load_data_file(fixture("missing_id.csv"), &RecordSchema::default()).unwrap_err();
    assert!(matches!(err, GateViewError::MissingField { row: 1, ref field } if field == "id"));
}

#[test]
fn unknown_extension_is_rejected() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
    let err = load_data_file(path, &RecordSchema::default()).unwrap_err();
    assert!(matches!(err, GateViewError::UnknownFileType(_)));
}

#[test]
fn loaded_events_drive_a_view() {
    let data = load_data_file(fixture("events.csv"), &event_schema()).unwrap();
    let config = ViewConfig::default()
        .with_page_size(2)
        .with_default_columns(vec!["name".into(), "gate".into()]);
    let mut view = TableView::with_config(data.name, data.columns, data.records, &config).unwrap();

    view.set_clause("gate", [Value::text("North")]);
    view.sort_by("name");
    let names: Vec<String> = view
        .filtered_records()
        .map(|r| r.value("name").to_string())
        .collect();
    assert_eq!(names, vec!["Alice Tanaka", "Carol Ito", "Kato, Frank"]);
    assert_eq!(view.total_pages(), 2);

    let mut out = Vec::new();
    assert_eq!(view.export_csv(&mut out).unwrap(), 3);
    let csv = String::from_utf8(out).unwrap();
    assert_eq!(
        csv,
        "name,gate\nAlice Tanaka,North\nCarol Ito,North\n\"Kato, Frank\",North\n"
    );

    let counts = view.status_counts();
    assert_eq!(counts[&StatusClass::Normal], 3);
    assert_eq!(counts[&StatusClass::Offline], 1);
}

#[test]
fn zero_padded_codes_stay_text() {
    let data = load_data_file(fixture("gates.csv"), &RecordSchema::default()).unwrap();
    assert_eq!(data.records[0].value("card"), &Value::text("00123"));

    let mut view = TableView::new(data.name, data.columns, data.records, None, 10).unwrap();
    let domain = view.clause_domain("gate");
    let expected: BTreeSet<Value> = ["0001", "0002", "0010"].into_iter().map(Value::text).collect();
    assert_eq!(domain, expected);

    // Text codes still sort by their numeric value
    view.sort_by("gate");
    let gates: Vec<String> = view.filtered_records().map(|r| r.value("gate").to_string()).collect();
    assert_eq!(gates, vec!["0001", "0001", "0002", "0010"]);

    let mut out = Vec::new();
    view.export_csv(&mut out).unwrap();
    assert!(String::from_utf8(out).unwrap().contains("1,0001,00123\n"));
}

#[test]
fn repeated_id_in_a_file_is_rejected() {
    let err = load_data_file(fixture("duplicate_id.csv"), &RecordSchema::default()).unwrap_err();
    assert!(matches!(err, GateViewError::DuplicateId { row: 2, ref id } if id == "1"));
}

#[test]
fn replayed_file_gets_fresh_generated_ids() {
    let base = load_data_file(fixture("people.csv"), &RecordSchema::default()).unwrap();
    let mut view = TableView::new(base.name, base.columns, base.records, None, 10).unwrap();

    let first_id = next_free_id(view.store().all());
    assert_eq!(first_id, 4);
    let replay =
        load_data_file_with_id_start(fixture("people.csv"), &RecordSchema::default(), first_id)
            .unwrap();
    for record in replay.records {
        assert!(view.append(record));
    }
    assert_eq!(view.total_count(), 6);

    view.toggle_selected("1");
    assert_eq!(view.delete_selected(), 1);
    assert_eq!(view.total_count(), 5);
}
