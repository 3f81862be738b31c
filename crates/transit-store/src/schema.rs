//! Database schema and migrations.

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

/// Version written by this build. Bump it together with a new step in
/// [`migrate`].
pub const SCHEMA_VERSION: i32 = 1;

/// Bring the database at `conn` up to [`SCHEMA_VERSION`].
pub fn initialize(conn: &Connection) -> Result<()> {
    match stored_version(conn)? {
        0 => {
            create_schema_v1(conn)?;
            record_version(conn)
        }
        v if v < SCHEMA_VERSION => migrate(conn, v),
        _ => Ok(()),
    }
}

/// Version recorded in the database, or 0 for an empty file.
fn stored_version(conn: &Connection) -> Result<i32> {
    let has_table = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !has_table {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(version.unwrap_or(0))
}

fn record_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (id, version) VALUES (1, ?1)
         ON CONFLICT(id) DO UPDATE SET version = excluded.version",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

/// Create the initial schema (version 1).
fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- Lines, identified by (id, type) since ids are reused across networks
        CREATE TABLE IF NOT EXISTS lines (
            id INTEGER NOT NULL,
            type TEXT NOT NULL,
            area INTEGER,
            color INTEGER,
            long_name TEXT NOT NULL,
            short_name TEXT NOT NULL,
            PRIMARY KEY (id, type)
        );
        CREATE INDEX IF NOT EXISTS idx_lines_area ON lines(area);

        -- News items; the server provides no unique id, so the whole content is the key
        CREATE TABLE IF NOT EXISTS news_items (
            service_type TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            header TEXT NOT NULL,
            details TEXT NOT NULL,
            url TEXT NOT NULL,
            line_id INTEGER NOT NULL,
            line_type TEXT NOT NULL,
            affected_line_ids TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (service_type, start_date, end_date, header, details, url,
                         line_id, line_type),
            FOREIGN KEY (line_id, line_type) REFERENCES lines(id, type) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_news_items_line ON news_items(line_id, line_type);

        -- Stops, identified by (id, type)
        CREATE TABLE IF NOT EXISTS stops (
            id INTEGER NOT NULL,
            type TEXT NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            name TEXT NOT NULL,
            street TEXT NOT NULL,
            town TEXT NOT NULL,
            wheelchair_accessible INTEGER NOT NULL,
            cardinal_point TEXT,
            PRIMARY KEY (id, type)
        );

        -- Stop-line associations. The line side is deferred so that lines can be
        -- deleted and reinserted within one transaction before the check runs.
        CREATE TABLE IF NOT EXISTS stop_lines (
            stop_id INTEGER NOT NULL,
            stop_type TEXT NOT NULL,
            line_id INTEGER NOT NULL,
            line_type TEXT NOT NULL,
            PRIMARY KEY (stop_id, stop_type, line_id, line_type),
            FOREIGN KEY (stop_id, stop_type) REFERENCES stops(id, type) ON DELETE CASCADE,
            FOREIGN KEY (line_id, line_type) REFERENCES lines(id, type) ON DELETE CASCADE
                DEFERRABLE INITIALLY DEFERRED
        );
        CREATE INDEX IF NOT EXISTS idx_stop_lines_stop ON stop_lines(stop_id, stop_type);
        CREATE INDEX IF NOT EXISTS idx_stop_lines_line ON stop_lines(line_id, line_type);
        "#,
    )?;

    Ok(())
}

/// Upgrade an older database. The dataset is disposable, so a future step
/// may simply drop and recreate the tables; the next reload refills them.
fn migrate(conn: &Connection, from: i32) -> Result<()> {
    tracing::info!("Upgrading dataset schema {} -> {}", from, SCHEMA_VERSION);
    record_version(conn)
}
