//! Ad-hoc query engine for report tables.
//!
//! A [`FilterCriteria`] is a declarative, column-keyed filter (exact / contains / range per
//! column plus an optional calendar date range). [`apply`] narrows a
//! [`Table`](reporting_model::Table) with it, and [`aggregate`] reduces a table to one row per
//! group for charting.

#![forbid(unsafe_code)]

mod aggregate;
mod criteria;
mod filter;

pub use crate::aggregate::{aggregate, AggregateFunction, AggregationSpec, SortOrder};
pub use crate::criteria::{
    ColumnConstraint, DateRange, FilterCriteria, DATE_COLUMN_KEY, DATE_RANGE_KEY,
};
pub use crate::filter::{apply, Filter};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown column: {column}")]
    UnknownColumn { column: String },

    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("metric column {column} has no numeric values")]
    NonNumericMetric { column: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] reporting_model::ModelError),
}

impl QueryError {
    /// The missing column, when this error is [`QueryError::UnknownColumn`].
    pub fn unknown_column(&self) -> Option<&str> {
        match self {
            QueryError::UnknownColumn { column } => Some(column),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
