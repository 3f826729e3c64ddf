use chrono::{Days, NaiveDate};
use reporting_model::{ColumnSchema, ColumnType, Record, Table, Value};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::auth::Session;
use crate::{Result, SourceError};

/// Fetches the raw records behind an endpoint on behalf of a session.
pub trait DataSource {
    fn fetch(&self, session: &Session, endpoint: &str) -> Result<Vec<Record>>;
}

/// Fetch `endpoint` and build a [`Table`] from its records.
pub fn load_table(source: &dyn DataSource, session: &Session, endpoint: &str) -> Result<Table> {
    let records = source.fetch(session, endpoint)?;
    let table = Table::from_records(&records);
    log::debug!(
        "loaded {endpoint}: {} rows, {} columns",
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

/// Read an API response body as records.
///
/// A list of objects yields one record per object, and a single object yields one record.
pub fn records_from_json(body: &JsonValue) -> Result<Vec<Record>> {
    match body {
        JsonValue::Array(items) => items
            .iter()
            .map(|item| {
                item.as_object().cloned().ok_or_else(|| {
                    SourceError::Rejected(format!("expected a list of records, found {item}"))
                })
            })
            .collect(),
        JsonValue::Object(record) => Ok(vec![record.clone()]),
        other => Err(SourceError::Rejected(format!(
            "expected a list of records, found {other}"
        ))),
    }
}

/// In-memory endpoint -> records map.
#[derive(Clone, Debug, Default)]
pub struct StaticDataSource {
    endpoints: HashMap<String, Vec<Record>>,
}

impl StaticDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, endpoint: impl Into<String>, records: Vec<Record>) -> Self {
        self.endpoints.insert(endpoint.into(), records);
        self
    }

    /// Register `endpoint` from a JSON response body (see [`records_from_json`]).
    pub fn with_json(self, endpoint: impl Into<String>, body: &JsonValue) -> Result<Self> {
        let records = records_from_json(body)?;
        Ok(self.with_records(endpoint, records))
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &str> + '_ {
        self.endpoints.keys().map(String::as_str)
    }
}

impl DataSource for StaticDataSource {
    fn fetch(&self, session: &Session, endpoint: &str) -> Result<Vec<Record>> {
        if session.access_token.is_empty() {
            return Err(SourceError::MissingCredentials);
        }
        self.endpoints
            .get(endpoint)
            .cloned()
            .ok_or_else(|| SourceError::UnknownEndpoint(endpoint.to_string()))
    }
}

/// Five days of demo sales data starting 2023-01-01.
pub fn sample_table() -> Result<Table> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid sample start date");
    let rows = [
        ("A", "Customer 1", 100.0),
        ("B", "Customer 2", 200.0),
        ("A", "Customer 1", 150.0),
        ("C", "Customer 3", 300.0),
        ("B", "Customer 2", 250.0),
    ];

    let mut table = Table::new(vec![
        ColumnSchema::new("date", ColumnType::DateTime),
        ColumnSchema::new("category", ColumnType::String),
        ColumnSchema::new("customer", ColumnType::String),
        ColumnSchema::new("value", ColumnType::Number),
    ])?;

    for (offset, (category, customer, value)) in (0u64..).zip(rows) {
        let date = start.checked_add_days(Days::new(offset)).unwrap_or(start);
        table
            .push_row(vec![
                Value::from(date),
                Value::from(category),
                Value::from(customer),
                Value::Number(value),
            ])?;
    }
    Ok(table)
}
