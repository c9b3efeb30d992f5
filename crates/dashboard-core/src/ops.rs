//! Single-flight bookkeeping for named operations.
//!
//! Starting an operation under a key cancels whichever handle held that
//! key before. Cancellation is cooperative: the owner of a handle checks
//! [`OperationHandle::is_cancelled`] before every shared-state write and
//! walks away quietly once superseded.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Ticket for one run of a named operation.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    key: String,
    id: u64,
    token: CancellationToken,
}

impl OperationHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Process-unique sequence number, increasing with creation time.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the handle has been superseded or cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

/// Operation key -> currently registered handle.
#[derive(Default)]
pub struct OperationTracker {
    handles: Mutex<HashMap<String, OperationHandle>>,
    next_id: AtomicU64,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh handle for `key`, cancelling the previous one first.
    pub fn begin(&self, key: &str) -> OperationHandle {
        let handle = OperationHandle {
            key: key.to_string(),
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            token: CancellationToken::new(),
        };

        let mut handles = lock(&self.handles);
        if let Some(previous) = handles.remove(key) {
            previous.token.cancel();
            tracing::debug!(key, superseded = previous.id, by = handle.id, "Operation superseded");
        }
        handles.insert(key.to_string(), handle.clone());
        handle
    }

    /// Unregister `handle` if it is still the current one for its key.
    ///
    /// A superseded operation finishing late leaves its successor alone.
    pub fn end(&self, handle: &OperationHandle) {
        let mut handles = lock(&self.handles);
        if handles.get(&handle.key).is_some_and(|h| h.id == handle.id) {
            handles.remove(&handle.key);
        }
    }

    pub fn has_ongoing(&self, key: &str) -> bool {
        lock(&self.handles)
            .get(key)
            .is_some_and(|h| !h.is_cancelled())
    }

    /// Cancel and unregister whatever runs under `key`.
    pub fn cancel(&self, key: &str) -> bool {
        match lock(&self.handles).remove(key) {
            Some(handle) => {
                handle.token.cancel();
                tracing::debug!(key, id = handle.id, "Operation cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let drained: Vec<_> = lock(&self.handles).drain().map(|(_, h)| h).collect();
        for handle in drained {
            handle.token.cancel();
        }
    }

    pub fn ongoing_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = lock(&self.handles).keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Keys currently being refreshed on explicit request.
///
/// Read by the background watcher so it stays out of the way of a
/// manual refresh.
#[derive(Default)]
pub struct RefreshRegistry {
    keys: Mutex<HashSet<String>>,
}

impl RefreshRegistry {
    /// Mark `key` as refreshing until the guard is dropped.
    pub fn mark(&self, key: &str) -> RefreshGuard<'_> {
        lock(&self.keys).insert(key.to_string());
        RefreshGuard {
            registry: self,
            key: key.to_string(),
        }
    }

    pub fn is_refreshing(&self, key: &str) -> bool {
        lock(&self.keys).contains(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.keys).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.keys).is_empty()
    }
}

pub struct RefreshGuard<'a> {
    registry: &'a RefreshRegistry,
    key: String,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        lock(&self.registry.keys).remove(&self.key);
    }
}
