//! Types shared by every entity context.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dota_client::{Fetchers, Transport};
use serde::{Deserialize, Serialize};

use crate::ops::{OperationTracker, RefreshRegistry};
use crate::persist::Persistence;

/// Load state of one entity in a context collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    /// A fetch is in flight; data may be absent (first load) or stale.
    Pending,
    Ready,
    Failed,
}

/// Result of a context command.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome<T> {
    Ready(T),
    Failed(String),
    /// A newer command for the same key took over. Not an error.
    Superseded,
}

impl<T> LoadOutcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}

/// What happens to an entity whose very first load fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FirstLoadFailure {
    /// Keep it in the list in the failed state so it can be retried.
    #[default]
    Keep,
    /// Drop it from the list.
    Remove,
}

impl FromStr for FirstLoadFailure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "remove" => Ok(Self::Remove),
            other => Err(format!("must be 'keep' or 'remove', got '{other}'")),
        }
    }
}

impl fmt::Display for FirstLoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => f.write_str("keep"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// Contract violations by callers of a context command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },
}

/// State every context shares. Built once per coordinator.
pub struct Services {
    pub fetchers: Fetchers,
    pub tracker: OperationTracker,
    pub refreshing: RefreshRegistry,
    pub persistence: Arc<dyn Persistence>,
    pub first_load_failure: FirstLoadFailure,
}

impl Services {
    pub fn new(
        transport: Arc<dyn Transport>,
        persistence: Arc<dyn Persistence>,
        first_load_failure: FirstLoadFailure,
    ) -> Self {
        Self {
            fetchers: Fetchers::new(transport),
            tracker: OperationTracker::new(),
            refreshing: RefreshRegistry::default(),
            persistence,
            first_load_failure,
        }
    }
}
