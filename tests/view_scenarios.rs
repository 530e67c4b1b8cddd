use gateview::columns::Column;
use gateview::domain::ViewError;
use gateview::record::{Record, STATUS_FIELD, StatusClass, Value};
use gateview::sort::Direction;
use gateview::view::TableView;

fn gate_event(id: u32, status: StatusClass, gate: &str) -> Record {
    Record::new(id.to_string(), status).with_field("gate", gate)
}

fn ids(view: &TableView) -> Vec<String> {
    view.page_records().iter().map(|r| r.id().to_string()).collect()
}

fn keys(view: &TableView) -> Vec<String> {
    view.columns().ordered().map(|c| c.key.clone()).collect()
}

#[test]
fn status_filter_keeps_original_order() {
    let records = vec![
        gate_event(1, StatusClass::Normal, "0001"),
        gate_event(2, StatusClass::Error, "0002"),
        gate_event(3, StatusClass::Normal, "0001"),
    ];
    let columns = vec![Column::new("gate", "Gate"), Column::new(STATUS_FIELD, "Status")];
    let mut view = TableView::new("gates", columns, records, None, 30).unwrap();

    view.set_clause(STATUS_FIELD, [Value::text("normal")]);
    assert_eq!(ids(&view), vec!["1", "3"]);
    assert!(view.snapshot().headers[1].filtered);
}

#[test]
fn third_page_of_five_records() {
    let records = (1..=5).map(|i| gate_event(i, StatusClass::Normal, "0001")).collect();
    let mut view = TableView::new("gates", vec![Column::new("gate", "Gate")], records, None, 2).unwrap();

    assert!(view.go_to(3));
    assert_eq!(ids(&view), vec!["5"]);
    assert!(!view.go_to(4));
    assert_eq!(view.pages().current_page(), 3);
    assert_eq!(ids(&view), vec!["5"]);

    let summary = view.summary();
    assert_eq!((summary.first_row, summary.last_row), (5, 5));
}

#[test]
fn reorder_moves_column_before_target() {
    let columns = vec![Column::new("a", "A"), Column::new("b", "B"), Column::new("c", "C")];
    let mut view = TableView::new("cols", columns, Vec::new(), None, 10).unwrap();
    view.reorder("c", "a");
    assert_eq!(keys(&view), vec!["c", "a", "b"]);
}

#[test]
fn unchecking_every_value_empties_the_view() {
    let records = (1..=4).map(|i| gate_event(i, StatusClass::Normal, "0001")).collect();
    let mut view = TableView::new("gates", vec![Column::new("gate", "Gate")], records, None, 2).unwrap();

    view.set_clause("gate", Vec::<Value>::new());
    assert!(view.page_records().is_empty());
    assert_eq!(view.total_pages(), 1);
    assert_eq!(view.pages().current_page(), 1);

    // Ticking the whole domain again lifts the clause
    let domain = view.clause_domain("gate");
    view.set_clause("gate", domain);
    assert!(!view.filters().is_active("gate"));
    assert_eq!(view.filtered_count(), 4);
}

#[test]
fn filters_sort_and_pages_compose() {
    let records = vec![
        gate_event(1, StatusClass::Normal, "0003"),
        gate_event(2, StatusClass::Error, "0001"),
        gate_event(3, StatusClass::Normal, "0002"),
        gate_event(4, StatusClass::Warning, "0001"),
        gate_event(5, StatusClass::Normal, "0001"),
    ];
    let columns = vec![Column::new("gate", "Gate"), Column::new(STATUS_FIELD, "Status")];
    let mut view = TableView::new("gates", columns, records, None, 2).unwrap();

    view.set_clause(STATUS_FIELD, [Value::text("normal"), Value::text("warning")]);
    view.sort_by("gate");
    assert_eq!(ids(&view), vec!["4", "5"]);
    view.next_page();
    assert_eq!(ids(&view), vec!["3", "1"]);

    view.sort_by("gate");
    assert_eq!(view.sort_spec().direction(), Direction::Descending);
    assert_eq!(view.pages().current_page(), 1);
    assert_eq!(ids(&view), vec!["1", "3"]);

    // Narrowing the filter clamps instead of jumping back to page 1
    view.next_page();
    view.set_clause("gate", [Value::text("0001")]);
    assert_eq!(view.pages().current_page(), 1);
    assert_eq!(ids(&view), vec!["4", "5"]);
}

#[test]
fn live_appends_land_on_top_and_respect_filters() {
    let columns = vec![Column::new("gate", "Gate"), Column::new(STATUS_FIELD, "Status")];
    let mut view = TableView::new("live", columns, Vec::new(), Some(4), 2).unwrap();
    view.set_clause(STATUS_FIELD, [Value::text("error")]);

    for i in 1..=6 {
        let status = if i % 2 == 0 { StatusClass::Error } else { StatusClass::Normal };
        view.append(gate_event(i, status, "0001"));
    }
    assert_eq!(view.total_count(), 4);
    assert_eq!(ids(&view), vec!["6", "4"]);
}

#[test]
fn rejected_operations_leave_the_view_alone() {
    let records = (1..=3).map(|i| gate_event(i, StatusClass::Normal, "0001")).collect();
    let columns = vec![Column::new("gate", "Gate"), Column::new("name", "Name")];
    let mut view = TableView::new("gates", columns, records, None, 2).unwrap();
    view.next_page();
    let before = view.snapshot();

    assert!(matches!(
        view.set_page_size(0),
        Err(ViewError::InvalidPageSize { .. })
    ));
    view.set_visible("name", false).unwrap();
    assert_eq!(view.set_visible("gate", false), Err(ViewError::LastColumn));
    assert_eq!(view.columns().visible_count(), 1);

    view.show_all_columns();
    assert_eq!(view.snapshot(), before);

    assert!(TableView::new("bad", Vec::new(), Vec::new(), None, 0).is_err());
}
