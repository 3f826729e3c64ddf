use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::value::{ColumnType, Value};

/// A flat record as returned by a data source: field name -> JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("duplicate column: {column}")]
    DuplicateColumn { column: String },

    #[error("schema mismatch: expected {expected} values, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Row-oriented in-memory table.
///
/// Rows keep insertion order. Every row has exactly one value per column.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    schema: Vec<ColumnSchema>,
    column_index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(schema: Vec<ColumnSchema>) -> crate::Result<Self> {
        let mut column_index = HashMap::with_capacity(schema.len());
        for (idx, column) in schema.iter().enumerate() {
            if column_index.insert(column.name.clone(), idx).is_some() {
                return Err(ModelError::DuplicateColumn {
                    column: column.name.clone(),
                });
            }
        }

        Ok(Self {
            schema,
            column_index,
            rows: Vec::new(),
        })
    }

    pub fn with_rows(schema: Vec<ColumnSchema>, rows: Vec<Vec<Value>>) -> crate::Result<Self> {
        let mut table = Self::new(schema)?;
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Build a table from flat JSON records.
    ///
    /// Columns appear in first-seen order across all records. A field missing from a record
    /// is [`Value::Null`]. Nested objects are flattened into dotted names (`customer.name`)
    /// and arrays are kept as their compact JSON text. Column kinds are inferred from the
    /// non-null values.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut names: Vec<String> = Vec::new();
        let mut column_index: HashMap<String, usize> = HashMap::new();
        let mut sparse_rows: Vec<Vec<(usize, Value)>> = Vec::new();

        for record in records {
            let mut fields = Vec::with_capacity(record.len());
            for (key, value) in record {
                flatten_field(key.clone(), value, &mut fields);
            }

            let mut row = Vec::with_capacity(fields.len());
            for (name, value) in fields {
                let idx = match column_index.get(&name) {
                    Some(idx) => *idx,
                    None => {
                        let idx = names.len();
                        column_index.insert(name.clone(), idx);
                        names.push(name);
                        idx
                    }
                };
                row.push((idx, value));
            }
            sparse_rows.push(row);
        }

        let width = names.len();
        let rows: Vec<Vec<Value>> = sparse_rows
            .into_iter()
            .map(|fields| {
                let mut row = vec![Value::Null; width];
                for (idx, value) in fields {
                    row[idx] = value;
                }
                row
            })
            .collect();

        let schema = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let column_type = ColumnType::infer(rows.iter().map(|row| &row[idx]));
                ColumnSchema { name, column_type }
            })
            .collect();

        Self {
            schema,
            column_index,
            rows,
        }
    }

    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.schema.iter().map(|c| c.name.as_str())
    }

    pub fn column_count(&self) -> usize {
        self.schema.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_idx(&self, column: &str) -> Option<usize> {
        self.column_index.get(column).copied()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index.contains_key(column)
    }

    pub fn column(&self, column: &str) -> Option<&ColumnSchema> {
        self.column_idx(column).map(|idx| &self.schema[idx])
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> crate::Result<()> {
        if row.len() != self.schema.len() {
            return Err(ModelError::SchemaMismatch {
                expected: self.schema.len(),
                actual: row.len(),
            });
        }

        self.rows.push(row);
        Ok(())
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, row: usize) -> Option<&[Value]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_idx(column)?;
        self.rows.get(row)?.get(idx)
    }

    pub fn value_by_idx(&self, row: usize, idx: usize) -> Option<&Value> {
        self.rows.get(row)?.get(idx)
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |row| row.get(idx))
    }

    /// A new table with the same schema holding the given rows, in the given order.
    ///
    /// Out-of-range indices are skipped.
    pub fn select_rows(&self, rows: &[usize]) -> Table {
        Table {
            schema: self.schema.clone(),
            column_index: self.column_index.clone(),
            rows: rows
                .iter()
                .filter_map(|&row| self.rows.get(row).cloned())
                .collect(),
        }
    }
}

fn flatten_field(name: String, value: &serde_json::Value, out: &mut Vec<(String, Value)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, nested) in map {
                flatten_field(format!("{name}.{key}"), nested, out);
            }
        }
        serde_json::Value::Array(_) => out.push((name, Value::String(value.to_string()))),
        scalar => out.push((name, Value::from_json_scalar(scalar).unwrap_or_default())),
    }
}
