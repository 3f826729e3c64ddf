use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use reporting_model::{ColumnSchema, ColumnType, ModelError, Record, Table, Value};
use serde_json::json;

fn records(value: serde_json::Value) -> Vec<Record> {
    value
        .as_array()
        .expect("array of records")
        .iter()
        .map(|r| r.as_object().expect("record object").clone())
        .collect()
}

#[test]
fn from_records_keeps_first_seen_column_order_and_fills_missing_fields() {
    let records = records(json!([
        {"date": "2023-01-01", "category": "A", "value": 100},
        {"date": "2023-01-03", "value": 200, "note": "late"},
    ]));
    let table = Table::from_records(&records);

    let names: Vec<&str> = table.column_names().collect();
    assert_eq!(names, vec!["date", "category", "value", "note"]);
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.value(1, "category"), Some(&Value::Null));
    assert_eq!(table.value(0, "note"), Some(&Value::Null));
    assert_eq!(table.value(1, "value"), Some(&Value::Number(200.0)));
}

#[test]
fn from_records_infers_column_types() {
    let records = records(json!([
        {"s": "x", "n": 1, "b": true, "mixed": 1, "empty": null},
        {"s": null, "n": 2.5, "b": false, "mixed": "one", "empty": null},
    ]));
    let table = Table::from_records(&records);

    let types: Vec<ColumnType> = table.schema().iter().map(|c| c.column_type).collect();
    assert_eq!(
        types,
        vec![
            ColumnType::String,
            ColumnType::Number,
            ColumnType::Boolean,
            ColumnType::Any,
            ColumnType::Any,
        ]
    );
}

#[test]
fn from_records_flattens_nested_objects() {
    let records = records(json!([
        {"id": 1, "customer": {"name": "Customer 1", "tier": {"level": 2}}, "tags": ["a", "b"]},
    ]));
    let table = Table::from_records(&records);

    let names: Vec<&str> = table.column_names().collect();
    assert_eq!(names, vec!["id", "customer.name", "customer.tier.level", "tags"]);
    assert_eq!(
        table.value(0, "customer.name"),
        Some(&Value::String("Customer 1".to_string()))
    );
    assert_eq!(
        table.value(0, "tags"),
        Some(&Value::String(r#"["a","b"]"#.to_string()))
    );
}

#[test]
fn from_records_of_nothing_is_an_empty_table() {
    let table = Table::from_records(&Vec::<Record>::new());
    assert_eq!(table.column_count(), 0);
    assert!(table.is_empty());
}

#[test]
fn duplicate_columns_are_rejected() {
    let err = Table::new(vec![
        ColumnSchema::new("a", ColumnType::String),
        ColumnSchema::new("a", ColumnType::Number),
    ])
    .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateColumn { column } if column == "a"));
}

#[test]
fn push_row_checks_width() {
    let mut table = Table::new(vec![
        ColumnSchema::new("a", ColumnType::String),
        ColumnSchema::new("b", ColumnType::Number),
    ])
    .unwrap();

    table
        .push_row(vec![Value::from("x"), Value::from(1.0)])
        .unwrap();
    let err = table.push_row(vec![Value::from("y")]).unwrap_err();
    assert!(matches!(
        err,
        ModelError::SchemaMismatch {
            expected: 2,
            actual: 1
        }
    ));
    assert_eq!(table.row_count(), 1);
}

#[test]
fn select_rows_preserves_requested_order_and_schema() {
    let table = Table::with_rows(
        vec![ColumnSchema::new("n", ColumnType::Number)],
        (0..5).map(|i| vec![Value::from(i as f64)]).collect(),
    )
    .unwrap();

    let picked = table.select_rows(&[1, 3, 10]);
    assert_eq!(picked.schema(), table.schema());
    assert_eq!(
        picked.rows(),
        &[vec![Value::Number(1.0)], vec![Value::Number(3.0)]]
    );
}

#[test]
fn coerce_to_converts_strings_only() {
    assert_eq!(
        Value::from(" 42 ").coerce_to(ColumnType::Number),
        Some(Value::Number(42.0))
    );
    assert_eq!(
        Value::from("TRUE").coerce_to(ColumnType::Boolean),
        Some(Value::Boolean(true))
    );
    assert_eq!(
        Value::from("2023-01-02").coerce_to(ColumnType::DateTime),
        Some(Value::from(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()))
    );
    assert_eq!(Value::Number(1.0).coerce_to(ColumnType::String), None);
    assert_eq!(
        Value::Number(1.0).coerce_to(ColumnType::Any),
        Some(Value::Number(1.0))
    );
}

#[test]
fn total_cmp_orders_kinds_deterministically() {
    let mut values = vec![
        Value::from("b"),
        Value::Number(2.0),
        Value::Null,
        Value::from("a"),
        Value::Boolean(true),
        Value::from(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()),
        Value::Number(-1.0),
    ];
    values.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(
        values,
        vec![
            Value::Null,
            Value::Boolean(true),
            Value::Number(-1.0),
            Value::Number(2.0),
            Value::from(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()),
            Value::from("a"),
            Value::from("b"),
        ]
    );
}
