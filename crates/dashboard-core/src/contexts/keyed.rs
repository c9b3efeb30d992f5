use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dota_client::models::{MatchPayload, PlayerPayload};
use dota_client::{EntityKey, EntityType, FetchClient, Fetchers};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::entity::{CommandError, EntityStatus, FirstLoadFailure, LoadOutcome, Services};
use crate::ops::lock;
use crate::persist::{persist, restore};

/// Payload types held by an [`EntityContext`], keyed by a numeric id.
pub trait Loadable: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: EntityType;
    /// Name of the persisted collection.
    const COLLECTION: &'static str;

    fn client(fetchers: &Fetchers) -> &FetchClient<Self>;
}

impl Loadable for MatchPayload {
    const KIND: EntityType = EntityType::Match;
    const COLLECTION: &'static str = "matches";

    fn client(fetchers: &Fetchers) -> &FetchClient<Self> {
        &fetchers.matches
    }
}

impl Loadable for PlayerPayload {
    const KIND: EntityType = EntityType::Player;
    const COLLECTION: &'static str = "players";

    fn client(fetchers: &Fetchers) -> &FetchClient<Self> {
        &fetchers.players
    }
}

pub type MatchContext = EntityContext<MatchPayload>;
pub type PlayerContext = EntityContext<PlayerPayload>;

/// One entity in a context collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry<T> {
    pub id: u64,
    pub status: EntityStatus,
    #[serde(default)]
    pub error: Option<String>,
    /// `None` until the first successful load.
    pub data: Option<T>,
}

impl<T> Entry<T> {
    fn placeholder(id: u64) -> Self {
        Self {
            id,
            status: EntityStatus::Pending,
            error: None,
            data: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == EntityStatus::Pending
    }
}

struct ContextState<T> {
    entries: Vec<Entry<T>>,
    selected: Option<u64>,
    error_state: Option<String>,
    /// Contract violations keyed by operation key.
    command_errors: HashMap<String, String>,
}

impl<T> Default for ContextState<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            selected: None,
            error_state: None,
            command_errors: HashMap::new(),
        }
    }
}

impl<T> ContextState<T> {
    fn position(&self, id: u64) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}

/// Collection of one id-keyed entity type.
pub struct EntityContext<T> {
    services: Arc<Services>,
    state: Mutex<ContextState<T>>,
}

impl<T: Loadable> EntityContext<T> {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            state: Mutex::new(ContextState::default()),
        }
    }

    fn op_key(id: u64) -> String {
        format!("{}:{id}", T::KIND)
    }

    /// Insert `id` optimistically and load it.
    pub async fn add(&self, id: u64) -> LoadOutcome<T> {
        self.load(id, false).await
    }

    /// Force-reload an entity already in the collection.
    pub async fn refresh(&self, id: u64) -> LoadOutcome<T> {
        if !self.contains(id) {
            let err = CommandError::NotFound {
                kind: T::KIND.as_str(),
                key: id.to_string(),
            };
            let message = err.to_string();
            let mut state = lock(&self.state);
            state.command_errors.insert(Self::op_key(id), message.clone());
            state.error_state = Some(message.clone());
            return LoadOutcome::Failed(message);
        }
        self.load(id, true).await
    }

    async fn load(&self, id: u64, force: bool) -> LoadOutcome<T> {
        let op_key = Self::op_key(id);
        let handle = self.services.tracker.begin(&op_key);

        {
            let mut state = lock(&self.state);
            state.command_errors.remove(&op_key);
            match state.position(id) {
                Some(i) => state.entries[i].status = EntityStatus::Pending,
                None => state.entries.push(Entry::placeholder(id)),
            }
        }

        let result = T::client(&self.services.fetchers)
            .fetch(&EntityKey::single(id), force)
            .await;

        let outcome = {
            let mut state = lock(&self.state);
            if handle.is_cancelled() {
                tracing::debug!(kind = %T::KIND, id, "Load superseded; result discarded");
                return LoadOutcome::Superseded;
            }
            let Some(i) = state.position(id) else {
                self.services.tracker.end(&handle);
                return LoadOutcome::Superseded;
            };

            match result {
                Ok(value) => {
                    let entry = &mut state.entries[i];
                    entry.data = Some(value.clone());
                    entry.status = EntityStatus::Ready;
                    entry.error = None;
                    LoadOutcome::Ready(value)
                }
                Err(e) => {
                    let message = e.to_string();
                    let never_loaded = state.entries[i].data.is_none();
                    if never_loaded && self.services.first_load_failure == FirstLoadFailure::Remove {
                        state.entries.remove(i);
                        if state.selected == Some(id) {
                            state.selected = None;
                        }
                    } else {
                        let entry = &mut state.entries[i];
                        entry.status = EntityStatus::Failed;
                        entry.error = Some(message.clone());
                    }
                    state.error_state = Some(message.clone());
                    LoadOutcome::Failed(message)
                }
            }
        };

        self.persist();
        self.services.tracker.end(&handle);
        outcome
    }

    /// Cancel any load in flight for `id` and drop it from the collection.
    pub fn remove(&self, id: u64) -> bool {
        self.services.tracker.cancel(&Self::op_key(id));
        let removed = {
            let mut state = lock(&self.state);
            let before = state.entries.len();
            state.entries.retain(|e| e.id != id);
            if state.selected == Some(id) {
                state.selected = None;
            }
            state.entries.len() != before
        };
        if removed {
            self.persist();
        }
        removed
    }

    /// Remove every entity for which `keep` is false. Returns removed ids.
    pub fn retain(&self, keep: impl Fn(u64) -> bool) -> Vec<u64> {
        let removed: Vec<u64> = {
            let mut state = lock(&self.state);
            let removed: Vec<u64> = state
                .entries
                .iter()
                .filter(|e| !keep(e.id))
                .map(|e| e.id)
                .collect();
            state.entries.retain(|e| keep(e.id));
            if state.selected.is_some_and(|id| removed.contains(&id)) {
                state.selected = None;
            }
            removed
        };
        for id in &removed {
            self.services.tracker.cancel(&Self::op_key(*id));
        }
        if !removed.is_empty() {
            tracing::debug!(kind = %T::KIND, count = removed.len(), "Removed unreferenced entities");
            self.persist();
        }
        removed
    }

    /// `None` clears the selection.
    pub fn select(&self, id: Option<u64>) {
        lock(&self.state).selected = id;
    }

    pub fn selected(&self) -> Option<u64> {
        lock(&self.state).selected
    }

    pub fn active(&self) -> Option<Entry<T>> {
        let state = lock(&self.state);
        let id = state.selected?;
        state.entries.iter().find(|e| e.id == id).cloned()
    }

    pub fn get(&self, id: u64) -> Option<Entry<T>> {
        let state = lock(&self.state);
        state.entries.iter().find(|e| e.id == id).cloned()
    }

    pub fn contains(&self, id: u64) -> bool {
        lock(&self.state).position(id).is_some()
    }

    pub fn list(&self) -> Vec<Entry<T>> {
        lock(&self.state).entries.clone()
    }

    pub fn ids(&self) -> Vec<u64> {
        lock(&self.state).entries.iter().map(|e| e.id).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.state).entries.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).entries.iter().any(Entry::is_loading)
    }

    /// Most recent failure seen by this context.
    pub fn error_state(&self) -> Option<String> {
        lock(&self.state).error_state.clone()
    }

    /// Contract violation recorded for `id`, e.g. refreshing an unknown id.
    pub fn command_error(&self, id: u64) -> Option<String> {
        lock(&self.state).command_errors.get(&Self::op_key(id)).cloned()
    }

    pub fn clear_errors(&self) {
        let mut state = lock(&self.state);
        state.error_state = None;
        state.command_errors.clear();
    }

    fn persist(&self) {
        let entries = lock(&self.state).entries.clone();
        persist(self.services.persistence.as_ref(), T::COLLECTION, &entries);
    }

    /// Reload the collection from persistence. Returns the entry count.
    ///
    /// Entries saved mid-load come back as not loading: populated ones
    /// as ready, placeholder-only ones are dropped.
    pub fn restore(&self) -> usize {
        let Some(mut entries) =
            restore::<Vec<Entry<T>>>(self.services.persistence.as_ref(), T::COLLECTION)
        else {
            return 0;
        };
        entries.retain(|e| e.status != EntityStatus::Pending || e.data.is_some());
        for entry in &mut entries {
            if entry.status == EntityStatus::Pending {
                entry.status = EntityStatus::Ready;
            }
        }

        let count = entries.len();
        lock(&self.state).entries = entries;
        tracing::debug!(kind = %T::KIND, count, "Restored collection");
        count
    }
}
