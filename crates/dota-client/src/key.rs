use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between natural identifiers. Ids are numeric, so it never
/// appears inside a part.
pub const KEY_SEPARATOR: char = ':';

/// Stable identifier for one fetched entity instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    /// Join natural identifiers into a key.
    pub fn join<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: fmt::Display,
    {
        let joined = parts
            .into_iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(&KEY_SEPARATOR.to_string());
        Self(joined)
    }

    /// Key for a single identifier.
    pub fn single(id: impl fmt::Display) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `index`-th natural identifier, or an empty string.
    pub fn part(&self, index: usize) -> &str {
        self.0.split(KEY_SEPARATOR).nth(index).unwrap_or("")
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
