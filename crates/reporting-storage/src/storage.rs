use crate::schema;
use crate::types::{Report, Visualization};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use reporting_query::{AggregationSpec, FilterCriteria, QueryError};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("report store unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("invalid report criteria: {0}")]
    InvalidCriteria(#[source] QueryError),
    #[error("report not found: {0}")]
    ReportNotFound(Uuid),
    #[error("visualization not found: {0}")]
    VisualizationNotFound(Uuid),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Connection settings applied every time a store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// How long a write waits for a lock held by another connection.
    pub busy_timeout: Duration,
    /// Switch the database to write-ahead logging. In-memory databases ignore this.
    pub wal: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            wal: true,
        }
    }
}

/// Durable, organization-scoped store of saved reports and visualizations.
///
/// Handles are cheap to clone and may be shared across threads. Every read is filtered by
/// organization id; records of one organization are never visible through another.
#[derive(Debug, Clone)]
pub struct ReportStore {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, Copy)]
struct RecordTable {
    name: &'static str,
    payload: &'static str,
}

const REPORTS: RecordTable = RecordTable {
    name: "reports",
    payload: "query",
};

const VISUALIZATIONS: RecordTable = RecordTable {
    name: "visualizations",
    payload: "spec",
};

impl ReportStore {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_path_with_options(path, StoreOptions::default())
    }

    pub fn open_path_with_options(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, options)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, StoreOptions::default())
    }

    /// Open a SQLite URI, e.g. `file:reports?mode=memory&cache=shared`.
    pub fn open_uri(uri: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI;
        let conn = Connection::open_with_flags(uri, flags)?;
        Self::from_connection(conn, StoreOptions::default())
    }

    fn from_connection(conn: Connection, options: StoreOptions) -> Result<Self> {
        conn.busy_timeout(options.busy_timeout)?;
        if options.wal {
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            log::debug!("report store journal_mode={mode}");
        }
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Persist `criteria` as a new report and return its generated id.
    pub fn save_report(
        &self,
        organization_id: &str,
        name: &str,
        criteria: &FilterCriteria,
    ) -> Result<Uuid> {
        check_owner(organization_id, name)?;
        criteria.validate().map_err(StorageError::InvalidCriteria)?;

        let query = serde_json::to_string(criteria)?;
        let id = self.insert(REPORTS, organization_id, name, &query)?;
        log::info!("saved report {id} ({name:?}) for organization {organization_id}");
        Ok(id)
    }

    /// Every report of `organization_id`, oldest first.
    ///
    /// Rows that can no longer be decoded are skipped.
    pub fn list_reports(&self, organization_id: &str) -> Result<Vec<Report>> {
        self.list_records(REPORTS, organization_id, decode_report)
    }

    pub fn get_report(&self, organization_id: &str, id: Uuid) -> Result<Report> {
        self.get_record(REPORTS, organization_id, id, decode_report)?
            .ok_or(StorageError::ReportNotFound(id))
    }

    /// Persist an aggregation as a new visualization and return its generated id.
    pub fn save_visualization(
        &self,
        organization_id: &str,
        name: &str,
        spec: &AggregationSpec,
    ) -> Result<Uuid> {
        check_owner(organization_id, name)?;
        if spec.group_by.is_empty() || spec.metric.is_empty() {
            return Err(StorageError::InvalidArgument(
                "group_by and metric must not be empty",
            ));
        }

        let payload = serde_json::to_string(spec)?;
        let id = self.insert(VISUALIZATIONS, organization_id, name, &payload)?;
        log::info!("saved visualization {id} ({name:?}) for organization {organization_id}");
        Ok(id)
    }

    pub fn list_visualizations(&self, organization_id: &str) -> Result<Vec<Visualization>> {
        self.list_records(VISUALIZATIONS, organization_id, decode_visualization)
    }

    pub fn get_visualization(&self, organization_id: &str, id: Uuid) -> Result<Visualization> {
        self.get_record(VISUALIZATIONS, organization_id, id, decode_visualization)?
            .ok_or(StorageError::VisualizationNotFound(id))
    }

    fn insert(
        &self,
        table: RecordTable,
        organization_id: &str,
        name: &str,
        payload: &str,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.execute(
            &format!(
                "INSERT INTO {} (id, organization_id, name, created_at, {}) VALUES (?1, ?2, ?3, ?4, ?5)",
                table.name, table.payload
            ),
            params![id.to_string(), organization_id, name, created_at, payload],
        )?;
        Ok(id)
    }

    fn list_records<T>(
        &self,
        table: RecordTable,
        organization_id: &str,
        decode: fn(Envelope) -> std::result::Result<T, String>,
    ) -> Result<Vec<T>> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT rowid, id, organization_id, name, created_at, {}
            FROM {}
            WHERE organization_id = ?1
            ORDER BY created_at, rowid
            "#,
            table.payload, table.name
        ))?;

        let rows = stmt.query_map(params![organization_id], StoredRow::read)?;
        let mut records = Vec::new();
        for row in rows {
            let row = row?;
            let rowid = row.rowid;
            match row.into_envelope().and_then(decode) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    log::warn!("skipping undecodable {} row {rowid}: {reason}", table.name)
                }
            }
        }
        Ok(records)
    }

    fn get_record<T>(
        &self,
        table: RecordTable,
        organization_id: &str,
        id: Uuid,
        decode: fn(Envelope) -> std::result::Result<T, String>,
    ) -> Result<Option<T>> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let row = conn
            .query_row(
                &format!(
                    r#"
                    SELECT rowid, id, organization_id, name, created_at, {}
                    FROM {}
                    WHERE organization_id = ?1 AND id = ?2
                    "#,
                    table.payload, table.name
                ),
                params![organization_id, id.to_string()],
                StoredRow::read,
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        let rowid = row.rowid;
        match row.into_envelope().and_then(decode) {
            Ok(record) => Ok(Some(record)),
            Err(reason) => {
                log::warn!("undecodable {} row {rowid}: {reason}", table.name);
                Ok(None)
            }
        }
    }
}

fn check_owner(organization_id: &str, name: &str) -> Result<()> {
    if organization_id.trim().is_empty() {
        return Err(StorageError::InvalidArgument(
            "organization_id must not be empty",
        ));
    }
    if name.trim().is_empty() {
        return Err(StorageError::InvalidArgument("name must not be empty"));
    }
    Ok(())
}

/// A stored row as read from SQLite. Cells that are not valid text are `None`.
struct StoredRow {
    rowid: i64,
    id: Option<String>,
    organization_id: Option<String>,
    name: Option<String>,
    created_at: Option<String>,
    payload: Option<String>,
}

/// The columns shared by every record kind, decoded.
struct Envelope {
    id: Uuid,
    organization_id: String,
    name: String,
    created_at: DateTime<Utc>,
    payload: String,
}

impl StoredRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            rowid: row.get(0)?,
            id: text(row, 1)?,
            organization_id: text(row, 2)?,
            name: text(row, 3)?,
            created_at: text(row, 4)?,
            payload: text(row, 5)?,
        })
    }

    fn into_envelope(self) -> std::result::Result<Envelope, String> {
        let id = self.id.ok_or("id is not text")?;
        let id = Uuid::parse_str(&id).map_err(|err| format!("invalid id {id:?}: {err}"))?;
        let organization_id = self.organization_id.ok_or("organization_id is not text")?;
        let name = self.name.ok_or("name is not text")?;
        let created_at = self.created_at.ok_or("created_at is not text")?;
        let created_at = parse_created_at(&created_at)
            .ok_or_else(|| format!("invalid created_at {created_at:?}"))?;
        let payload = self.payload.ok_or("payload is not text")?;

        Ok(Envelope {
            id,
            organization_id,
            name,
            created_at,
            payload,
        })
    }
}

/// RFC 3339, or an offset-less ISO timestamp (as older databases hold) read as UTC.
fn parse_created_at(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().map(str::to_string),
        _ => None,
    })
}

fn decode_report(envelope: Envelope) -> std::result::Result<Report, String> {
    let query = FilterCriteria::from_json_str(&envelope.payload)
        .map_err(|err| format!("invalid query: {err}"))?;
    Ok(Report {
        id: envelope.id,
        organization_id: envelope.organization_id,
        name: envelope.name,
        created_at: envelope.created_at,
        query,
    })
}

fn decode_visualization(envelope: Envelope) -> std::result::Result<Visualization, String> {
    let spec: AggregationSpec = serde_json::from_str(&envelope.payload)
        .map_err(|err| format!("invalid aggregation: {err}"))?;
    Ok(Visualization {
        id: envelope.id,
        organization_id: envelope.organization_id,
        name: envelope.name,
        created_at: envelope.created_at,
        spec,
    })
}
