//! Dota dashboard backend client library.
//!
//! Provides typed payload models, a pluggable HTTP transport, and
//! per-entity fetch clients with an in-memory cache and error map.

pub mod fetch;
pub mod fetchers;
pub mod key;
pub mod models;
pub mod transport;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use fetch::FetchClient;
pub use fetchers::Fetchers;
pub use key::EntityKey;
pub use transport::{HttpTransport, RawResponse, Transport};

/// The entity types the backend serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Team,
    League,
    Match,
    Player,
    Hero,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Team => "team",
            Self::League => "league",
            Self::Match => "match",
            Self::Player => "player",
            Self::Hero => "hero",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for fetch clients.
///
/// The `Display` output is what ends up in the error map, so it is
/// written for humans.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Network request failed: {0}")]
    Network(String),

    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("Failed to parse {kind} {key}: {message}")]
    Parse {
        kind: EntityType,
        key: String,
        message: String,
    },
}

impl FetchError {
    /// HTTP status for remote failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}
