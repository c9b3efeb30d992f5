//! Database schema definitions and migrations.

use rusqlite::Connection;

use crate::DbError;

pub fn run_migrations(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(SCHEMA)?;
    migrate_snapshots_add_version(conn)?;
    Ok(())
}

/// Early databases stored snapshots without a format version.
fn migrate_snapshots_add_version(conn: &Connection) -> Result<(), DbError> {
    if column_exists(conn, "snapshots", "version")? {
        return Ok(());
    }
    tracing::info!("Adding version column to snapshots");
    conn.execute_batch("ALTER TABLE snapshots ADD COLUMN version INTEGER NOT NULL DEFAULT 1;")?;
    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, DbError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .any(|name| name.as_deref() == Ok(column));
    Ok(exists)
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS snapshots (
    name TEXT PRIMARY KEY,
    body TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;
