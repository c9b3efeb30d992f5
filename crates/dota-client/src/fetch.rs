//! Per-entity fetch client.
//!
//! Wraps a backend route with an in-memory cache and a parallel error
//! map. At most one network call per key unless the caller forces a
//! refetch. Concurrent fetches of the same key are not coalesced here.


use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::{EntityKey, EntityType, FetchError, RawResponse, Transport};

/// Builds the backend route path for a key.
pub type RouteFn = fn(&EntityKey) -> String;

/// Error body the backend sends with non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct FetchClient<V> {
    kind: EntityType,
    transport: Arc<dyn Transport>,
    route: RouteFn,
    /// Key -> last successfully fetched value.
    cache: Mutex<HashMap<EntityKey, V>>,
    /// Key -> last error message. Cleared on success.
    errors: Mutex<HashMap<EntityKey, String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl<V> FetchClient<V>
where
    V: DeserializeOwned + Clone + Send + Sync,
{
    pub fn new(kind: EntityType, transport: Arc<dyn Transport>, route: RouteFn) -> Self {
        Self {
            kind,
            transport,
            route,
            cache: Mutex::new(HashMap::new()),
            errors: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> EntityType {
        self.kind
    }

    /// Fetch one entity.
    ///
    /// Without `force`, a cached value is returned without touching the
    /// network. Failures are recorded in the error map and any previously
    /// cached value is left in place.
    pub async fn fetch(&self, key: &EntityKey, force: bool) -> Result<V, FetchError> {
        if !force {
            if let Some(value) = self.cached(key) {
                tracing::debug!(kind = %self.kind, key = %key, "Served from cache");
                return Ok(value);
            }
        }

        match self.request(key, force).await {
            Ok(value) => {
                lock(&self.cache).insert(key.clone(), value.clone());
                lock(&self.errors).remove(key);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(kind = %self.kind, key = %key, error = %e, "Fetch failed");
                lock(&self.errors).insert(key.clone(), e.to_string());
                Err(e)
            }
        }
    }

    async fn request(&self, key: &EntityKey, force: bool) -> Result<V, FetchError> {
        let path = (self.route)(key);
        let resp = self.transport.get(&path, force).await?;

        if !resp.is_success() {
            return Err(FetchError::Remote {
                status: resp.status,
                message: remote_message(&resp),
            });
        }

        serde_json::from_str(&resp.body).map_err(|e| FetchError::Parse {
            kind: self.kind,
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// Drop one entry (and its error), or everything when `key` is `None`.
    pub fn invalidate(&self, key: Option<&EntityKey>) {
        match key {
            Some(key) => {
                lock(&self.cache).remove(key);
                lock(&self.errors).remove(key);
            }
            None => {
                lock(&self.cache).clear();
                lock(&self.errors).clear();
            }
        }
    }

    pub fn cached(&self, key: &EntityKey) -> Option<V> {
        lock(&self.cache).get(key).cloned()
    }

    pub fn error(&self, key: &EntityKey) -> Option<String> {
        lock(&self.errors).get(key).cloned()
    }

    pub fn cached_len(&self) -> usize {
        lock(&self.cache).len()
    }
}

/// `error` field of the body if present, else the status text.
fn remote_message(resp: &RawResponse) -> String {
    serde_json::from_str::<ErrorBody>(&resp.body)
        .ok()
        .map(|b| b.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if resp.status_text.is_empty() {
                format!("HTTP {}", resp.status)
            } else {
                resp.status_text.clone()
            }
        })
}
