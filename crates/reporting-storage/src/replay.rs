use reporting_model::Table;
use reporting_query::{aggregate, apply, QueryError};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{Report, Visualization};

#[derive(Debug, Error)]
pub enum ReplayError {
    /// The stored definition names a column the current data no longer has.
    #[error("stored report {id} is incompatible with current data: {source}")]
    Incompatible {
        id: Uuid,
        #[source]
        source: QueryError,
    },
    #[error(transparent)]
    Query(QueryError),
}

impl ReplayError {
    fn from_query(id: Uuid, err: QueryError) -> Self {
        if err.unknown_column().is_none() {
            return ReplayError::Query(err);
        }
        log::warn!("stored definition {id} no longer matches the data: {err}");
        ReplayError::Incompatible { id, source: err }
    }
}

/// Re-apply a saved report's criteria to freshly loaded data.
pub fn replay(table: &Table, report: &Report) -> Result<Table, ReplayError> {
    apply(table, &report.query).map_err(|err| ReplayError::from_query(report.id, err))
}

/// Rebuild a saved visualization's chart data from freshly loaded data.
pub fn replay_visualization(
    table: &Table,
    visualization: &Visualization,
) -> Result<Table, ReplayError> {
    aggregate(table, &visualization.spec)
        .map_err(|err| ReplayError::from_query(visualization.id, err))
}
