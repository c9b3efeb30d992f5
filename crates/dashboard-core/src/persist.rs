//! Best-effort persistence of context collections.

use dashboard_db::{Database, DbError};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Bumped whenever a persisted collection changes shape.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Persistence backend error: {0}")]
    Backend(String),
}

/// Storage for serialized collections, keyed by collection name.
pub trait Persistence: Send + Sync {
    fn save(&self, collection: &str, body: &str) -> Result<(), PersistError>;
    fn load(&self, collection: &str) -> Result<Option<String>, PersistError>;
}

impl Persistence for Database {
    fn save(&self, collection: &str, body: &str) -> Result<(), PersistError> {
        self.save_snapshot(collection, body, SNAPSHOT_VERSION)?;
        Ok(())
    }

    fn load(&self, collection: &str) -> Result<Option<String>, PersistError> {
        let Some(snapshot) = self.load_snapshot(collection)? else {
            return Ok(None);
        };
        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(
                collection,
                version = snapshot.version,
                "Ignoring snapshot with unknown version"
            );
            return Ok(None);
        }
        Ok(Some(snapshot.body))
    }
}

/// Persistence that keeps nothing.
pub struct NoPersistence;

impl Persistence for NoPersistence {
    fn save(&self, _collection: &str, _body: &str) -> Result<(), PersistError> {
        Ok(())
    }

    fn load(&self, _collection: &str) -> Result<Option<String>, PersistError> {
        Ok(None)
    }
}

/// Serialize and save `value`. Failures are logged and swallowed.
pub(crate) fn persist<T: Serialize>(backend: &dyn Persistence, collection: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(PersistError::from)
        .and_then(|body| backend.save(collection, &body));
    if let Err(e) = result {
        tracing::warn!(collection, error = %e, "Failed to persist collection");
    }
}

/// Load and deserialize a collection. Failures are logged and read as empty.
pub(crate) fn restore<T: DeserializeOwned>(backend: &dyn Persistence, collection: &str) -> Option<T> {
    let body = match backend.load(collection) {
        Ok(Some(body)) => body,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(collection, error = %e, "Failed to load persisted collection");
            return None;
        }
    };
    match serde_json::from_str(&body) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(collection, error = %e, "Discarding unreadable persisted collection");
            None
        }
    }
}
