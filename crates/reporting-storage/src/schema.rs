use rusqlite::Connection;

/// Bumped whenever `init` learns a new migration step.
const SCHEMA_VERSION: i64 = 1;

pub(crate) fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
          id TEXT PRIMARY KEY,
          organization_id TEXT NOT NULL,
          name TEXT NOT NULL,
          created_at TEXT NOT NULL,
          query TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reports_org ON reports(organization_id, created_at);

        CREATE TABLE IF NOT EXISTS visualizations (
          id TEXT PRIMARY KEY,
          organization_id TEXT NOT NULL,
          name TEXT NOT NULL,
          created_at TEXT NOT NULL,
          spec TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_visualizations_org ON visualizations(organization_id, created_at);
        "#,
    )?;

    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    Ok(())
}
