//! Named JSON snapshots of entity collections.

use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};

use crate::{Database, DbError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    pub body: String,
    pub version: u32,
    pub updated_at: String,
}

impl Database {
    /// Insert or replace the snapshot stored under `name`.
    pub fn save_snapshot(&self, name: &str, body: &str, version: u32) -> Result<(), DbError> {
        if name.is_empty() {
            return Err(DbError::InvalidData("snapshot name is empty".into()));
        }
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO snapshots (name, body, version, updated_at) VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
                 ON CONFLICT(name) DO UPDATE SET body = ?2, version = ?3, updated_at = CURRENT_TIMESTAMP",
                rusqlite::params![name, body, version],
            )?;
            Ok(())
        })
    }

    pub fn load_snapshot(&self, name: &str) -> Result<Option<Snapshot>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name, body, version, updated_at FROM snapshots WHERE name = ?1",
            )?;
            let snapshot = stmt
                .query_row([name], |row| {
                    Ok(Snapshot {
                        name: row.get(0)?,
                        body: row.get(1)?,
                        version: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                })
                .optional()?;
            Ok(snapshot)
        })
    }

    pub fn delete_snapshot(&self, name: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM snapshots WHERE name = ?1", [name])?;
            Ok(())
        })
    }

    /// Names of all stored snapshots, alphabetical.
    pub fn list_snapshots(&self) -> Result<Vec<String>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM snapshots ORDER BY name")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }
}
