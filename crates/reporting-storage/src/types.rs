use chrono::{DateTime, Utc};
use reporting_query::{AggregationSpec, FilterCriteria};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A saved filter definition, owned by one organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub organization_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub query: FilterCriteria,
}

/// A saved chart definition: the aggregation that produces its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    pub id: Uuid,
    pub organization_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub spec: AggregationSpec,
}
