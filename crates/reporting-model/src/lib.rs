//! In-memory table model for ad-hoc reports.
//!
//! This crate focuses on:
//! - A small scalar [`Value`] type (string / number / boolean / date-time / null).
//! - A row-oriented [`Table`] with named, nominally typed columns.
//! - Ingestion of flat JSON records as returned by REST data sources.
//! - Calendar-date coercion used by date-range filters.
//! - CSV export of (filtered) tables.

#![forbid(unsafe_code)]

mod date;
mod export;
mod table;
mod value;

pub use crate::date::{coerce_date, parse_date_time};
pub use crate::export::{write_csv, CsvExportOptions};
pub use crate::table::{ColumnSchema, ModelError, Record, Table};
pub use crate::value::{ColumnType, Value};

pub type Result<T> = std::result::Result<T, ModelError>;
