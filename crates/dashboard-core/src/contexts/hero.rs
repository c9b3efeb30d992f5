use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use dota_client::models::Hero;

use crate::entity::{EntityStatus, LoadOutcome, Services};
use crate::ops::lock;
use crate::persist::{persist, restore};

const COLLECTION: &str = "heroes";
const OP_KEY: &str = "heroes";

#[derive(Default)]
struct HeroState {
    heroes: BTreeMap<u32, Hero>,
    /// `None` until the first load starts.
    status: Option<EntityStatus>,
    error_state: Option<String>,
    selected: Option<u32>,
}

/// Hero constants, loaded once and looked up by id.
pub struct HeroContext {
    services: Arc<Services>,
    state: Mutex<HeroState>,
}

impl HeroContext {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            state: Mutex::new(HeroState::default()),
        }
    }

    /// Load the heroes list. Cached after the first success unless forced.
    pub async fn load(&self, force: bool) -> LoadOutcome<Vec<Hero>> {
        let handle = self.services.tracker.begin(OP_KEY);
        lock(&self.state).status = Some(EntityStatus::Pending);

        let result = self.services.fetchers.heroes(force).await;

        let outcome = {
            let mut state = lock(&self.state);
            if handle.is_cancelled() {
                return LoadOutcome::Superseded;
            }
            match result {
                Ok(heroes) => {
                    state.heroes = heroes.iter().map(|h| (h.id, h.clone())).collect();
                    state.status = Some(EntityStatus::Ready);
                    tracing::debug!(count = heroes.len(), "Heroes loaded");
                    LoadOutcome::Ready(heroes)
                }
                Err(e) => {
                    let message = e.to_string();
                    state.status = Some(EntityStatus::Failed);
                    state.error_state = Some(message.clone());
                    LoadOutcome::Failed(message)
                }
            }
        };

        if matches!(outcome, LoadOutcome::Ready(_)) {
            self.persist();
        }
        self.services.tracker.end(&handle);
        outcome
    }

    pub fn hero(&self, id: u32) -> Option<Hero> {
        lock(&self.state).heroes.get(&id).cloned()
    }

    /// Heroes ordered by id.
    pub fn heroes(&self) -> Vec<Hero> {
        lock(&self.state).heroes.values().cloned().collect()
    }

    pub fn status(&self) -> Option<EntityStatus> {
        lock(&self.state).status
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).status == Some(EntityStatus::Pending)
    }

    pub fn select(&self, id: Option<u32>) {
        lock(&self.state).selected = id;
    }

    pub fn selected_hero(&self) -> Option<Hero> {
        let state = lock(&self.state);
        state.selected.and_then(|id| state.heroes.get(&id).cloned())
    }

    pub fn error_state(&self) -> Option<String> {
        lock(&self.state).error_state.clone()
    }

    pub fn clear_errors(&self) {
        lock(&self.state).error_state = None;
    }

    fn persist(&self) {
        let heroes = self.heroes();
        persist(self.services.persistence.as_ref(), COLLECTION, &heroes);
    }

    pub fn restore(&self) -> usize {
        let Some(heroes) = restore::<Vec<Hero>>(self.services.persistence.as_ref(), COLLECTION) else {
            return 0;
        };
        let mut state = lock(&self.state);
        state.heroes = heroes.into_iter().map(|h| (h.id, h)).collect();
        state.status = Some(EntityStatus::Ready);
        state.heroes.len()
    }
}
