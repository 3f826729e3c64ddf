//! SQLite-backed persistence for saved reports.
//!
//! A report is a named [`FilterCriteria`](reporting_query::FilterCriteria) owned by one
//! organization; a visualization is a named
//! [`AggregationSpec`](reporting_query::AggregationSpec). Both are immutable once saved and
//! can be replayed against freshly fetched data with [`replay`] / [`replay_visualization`].

#![forbid(unsafe_code)]

mod replay;
mod schema;
pub mod storage;
mod types;

pub use replay::{replay, replay_visualization, ReplayError};
pub use storage::{ReportStore, StorageError, StoreOptions};
pub use types::{Report, Visualization};
