use pretty_assertions::assert_eq;
use reporting_model::{Record, Table, Value};
use reporting_query::{AggregateFunction, AggregationSpec, FilterCriteria, QueryError};
use reporting_storage::{replay, replay_visualization, ReplayError, ReportStore};
use serde_json::json;

fn table(value: serde_json::Value) -> Table {
    let records: Vec<Record> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r.as_object().unwrap().clone())
        .collect();
    Table::from_records(&records)
}

fn fresh_data() -> Table {
    table(json!([
        {"date": "2023-01-01", "category": "A", "value": 100},
        {"date": "2023-01-02", "category": "B", "value": 200},
        {"date": "2023-01-03", "category": "A", "value": 150},
    ]))
}

#[test]
fn stored_report_replays_against_fresh_data() {
    let store = ReportStore::open_in_memory().expect("open store");
    let id = store
        .save_report("org-1", "A only", &FilterCriteria::new().exact("category", "A"))
        .expect("save report");
    let report = store.get_report("org-1", id).expect("get report");

    let result = replay(&fresh_data(), &report).expect("replay");
    let idx = result.column_idx("value").unwrap();
    let values: Vec<Value> = result.column_values(idx).cloned().collect();
    assert_eq!(values, vec![Value::Number(100.0), Value::Number(150.0)]);
}

#[test]
fn schema_drift_is_reported_as_incompatible() {
    let store = ReportStore::open_in_memory().expect("open store");
    let id = store
        .save_report("org-1", "By region", &FilterCriteria::new().exact("region", "EMEA"))
        .expect("save report");
    let report = store.get_report("org-1", id).expect("get report");

    let err = replay(&fresh_data(), &report).unwrap_err();
    assert!(err.to_string().contains("is incompatible with current data"));
    match err {
        ReplayError::Incompatible { id: report_id, source } => {
            assert_eq!(report_id, id);
            assert_eq!(source.unknown_column(), Some("region"));
        }
        other => panic!("expected incompatible, got {other:?}"),
    }
}

#[test]
fn other_query_errors_pass_through() {
    let store = ReportStore::open_in_memory().expect("open store");
    let id = store
        .save_report("org-1", "Words", &FilterCriteria::new().range("value", "low", "high"))
        .expect("save report");
    let report = store.get_report("org-1", id).expect("get report");

    let err = replay(&fresh_data(), &report).unwrap_err();
    assert!(matches!(
        err,
        ReplayError::Query(QueryError::InvalidCriteria(_))
    ));
}

#[test]
fn stored_visualization_rebuilds_chart_data() {
    let store = ReportStore::open_in_memory().expect("open store");
    let id = store
        .save_visualization(
            "org-1",
            "Totals",
            &AggregationSpec::new("category", "value", AggregateFunction::Sum),
        )
        .expect("save visualization");
    let visualization = store.get_visualization("org-1", id).expect("get");

    let chart = replay_visualization(&fresh_data(), &visualization).expect("replay");
    assert_eq!(
        chart.rows(),
        &[
            vec![Value::from("A"), Value::Number(250.0)],
            vec![Value::from("B"), Value::Number(200.0)],
        ]
    );

    let drifted = table(json!([{"kind": "A", "value": 1}]));
    assert!(matches!(
        replay_visualization(&drifted, &visualization),
        Err(ReplayError::Incompatible { .. })
    ));
}
