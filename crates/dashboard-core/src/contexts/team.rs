use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use dota_client::models::MatchPayload;

use crate::aggregate::{MatchParticipation, TeamAggregate, TeamKey};
use crate::entity::{CommandError, EntityStatus, FirstLoadFailure, LoadOutcome, Services};
use crate::ops::{OperationHandle, lock};
use crate::persist::{persist, restore};

const COLLECTION: &str = "teams";

#[derive(Default)]
struct TeamState {
    teams: Vec<TeamAggregate>,
    active: Option<TeamKey>,
    error_state: Option<String>,
    command_errors: HashMap<TeamKey, String>,
}

impl TeamState {
    fn position(&self, key: TeamKey) -> Option<usize> {
        self.teams.iter().position(|t| t.key() == key)
    }
}

/// Tracked teams, each scoped to one league.
pub struct TeamContext {
    services: Arc<Services>,
    state: Mutex<TeamState>,
}

impl TeamContext {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            state: Mutex::new(TeamState::default()),
        }
    }

    pub fn op_key(key: TeamKey) -> String {
        format!("team:{key}")
    }

    /// Insert the team optimistically, then load team and league.
    pub async fn add(&self, key: TeamKey) -> LoadOutcome<TeamAggregate> {
        self.load(key, false).await
    }

    /// Force-reload a team already in the collection.
    pub async fn refresh(&self, key: TeamKey) -> LoadOutcome<TeamAggregate> {
        if !self.contains(key) {
            let message = CommandError::NotFound {
                kind: "team",
                key: key.to_string(),
            }
            .to_string();
            let mut state = lock(&self.state);
            state.command_errors.insert(key, message.clone());
            state.error_state = Some(message.clone());
            return LoadOutcome::Failed(message);
        }
        self.load(key, true).await
    }

    async fn load(&self, key: TeamKey, force: bool) -> LoadOutcome<TeamAggregate> {
        let handle = self.services.tracker.begin(&Self::op_key(key));

        {
            let mut state = lock(&self.state);
            state.command_errors.remove(&key);
            match state.position(key) {
                Some(i) => state.teams[i].status = EntityStatus::Pending,
                None => state.teams.push(TeamAggregate::placeholder(key)),
            }
        }

        let fetchers = &self.services.fetchers;
        let team = fetchers.team(key.team_id, key.league_id, force).await;
        if handle.is_cancelled() {
            tracing::debug!(team = %key, "Team load superseded after team fetch");
            return LoadOutcome::Superseded;
        }

        let team = match team {
            Ok(team) => team,
            Err(e) => {
                let outcome = self.fail(&handle, key, e.to_string());
                if !outcome.is_superseded() {
                    self.services.tracker.end(&handle);
                }
                return outcome;
            }
        };

        let league = fetchers.league(key.league_id, force).await;

        let outcome = {
            let mut state = lock(&self.state);
            if handle.is_cancelled() {
                tracing::debug!(team = %key, "Team load superseded after league fetch");
                return LoadOutcome::Superseded;
            }
            let Some(i) = state.position(key) else {
                self.services.tracker.end(&handle);
                return LoadOutcome::Superseded;
            };

            let league_error = league.as_ref().err().map(|e| e.to_string());
            let aggregate = &mut state.teams[i];
            aggregate.apply_team(&team);
            match &league {
                Ok(league) => aggregate.apply_league(league),
                Err(e) => {
                    tracing::warn!(team = %key, error = %e, "League fetch failed; keeping team without league name");
                }
            }
            aggregate.status = EntityStatus::Ready;
            aggregate.error = None;
            let snapshot = aggregate.clone();
            if let Some(message) = league_error {
                state.error_state = Some(message);
            }
            LoadOutcome::Ready(snapshot)
        };

        self.persist();
        self.services.tracker.end(&handle);
        outcome
    }

    fn fail(&self, handle: &OperationHandle, key: TeamKey, message: String) -> LoadOutcome<TeamAggregate> {
        {
            let mut state = lock(&self.state);
            if handle.is_cancelled() {
                tracing::debug!(team = %key, "Team load superseded; failure discarded");
                return LoadOutcome::Superseded;
            }
            if let Some(i) = state.position(key) {
                let remove = state.teams[i].is_placeholder()
                    && self.services.first_load_failure == FirstLoadFailure::Remove;
                if remove {
                    state.teams.remove(i);
                    if state.active == Some(key) {
                        state.active = None;
                    }
                } else {
                    let team = &mut state.teams[i];
                    team.status = EntityStatus::Failed;
                    team.error = Some(message.clone());
                }
            }
            state.error_state = Some(message.clone());
        }
        self.persist();
        LoadOutcome::Failed(message)
    }

    /// Record the team's participation in a fetched match.
    ///
    /// Returns `None` when the team is on neither side of the match or is
    /// no longer tracked.
    pub fn apply_match(&self, key: TeamKey, payload: &MatchPayload) -> Option<MatchParticipation> {
        let participation = {
            let mut state = lock(&self.state);
            let i = state.position(key)?;
            let participation = MatchParticipation::derive(key.team_id, payload)?;
            state.teams[i].apply_participation(participation.clone());
            participation
        };
        self.persist();
        Some(participation)
    }

    /// Cancel any load for `key` and drop the team.
    pub fn remove(&self, key: TeamKey) -> Option<TeamAggregate> {
        self.services.tracker.cancel(&Self::op_key(key));
        let removed = {
            let mut state = lock(&self.state);
            let i = state.position(key)?;
            if state.active == Some(key) {
                state.active = None;
            }
            state.command_errors.remove(&key);
            state.teams.remove(i)
        };
        self.persist();
        Some(removed)
    }

    /// Match ids listed or played by any tracked team.
    pub fn referenced_match_ids(&self) -> HashSet<u64> {
        let state = lock(&self.state);
        state
            .teams
            .iter()
            .flat_map(|t| t.match_ids.iter().chain(t.matches.keys()).copied())
            .collect()
    }

    /// Account ids on any tracked team.
    pub fn referenced_player_ids(&self) -> HashSet<u64> {
        let state = lock(&self.state);
        state
            .teams
            .iter()
            .flat_map(|t| t.players.iter().copied())
            .collect()
    }

    /// `None` clears the selection.
    pub fn select(&self, key: Option<TeamKey>) {
        lock(&self.state).active = key;
    }

    pub fn active_key(&self) -> Option<TeamKey> {
        lock(&self.state).active
    }

    pub fn active_team(&self) -> Option<TeamAggregate> {
        let state = lock(&self.state);
        let key = state.active?;
        state.teams.iter().find(|t| t.key() == key).cloned()
    }

    /// All tracked teams in insertion order.
    pub fn teams(&self) -> Vec<TeamAggregate> {
        lock(&self.state).teams.clone()
    }

    pub fn keys(&self) -> Vec<TeamKey> {
        lock(&self.state).teams.iter().map(TeamAggregate::key).collect()
    }

    pub fn get(&self, key: TeamKey) -> Option<TeamAggregate> {
        let state = lock(&self.state);
        state.teams.iter().find(|t| t.key() == key).cloned()
    }

    pub fn contains(&self, key: TeamKey) -> bool {
        lock(&self.state).position(key).is_some()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).teams.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.state).teams.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).teams.iter().any(TeamAggregate::is_loading)
    }

    pub fn error_state(&self) -> Option<String> {
        lock(&self.state).error_state.clone()
    }

    pub fn command_error(&self, key: TeamKey) -> Option<String> {
        lock(&self.state).command_errors.get(&key).cloned()
    }

    pub fn clear_errors(&self) {
        let mut state = lock(&self.state);
        state.error_state = None;
        state.command_errors.clear();
    }

    fn persist(&self) {
        let teams = lock(&self.state).teams.clone();
        persist(self.services.persistence.as_ref(), COLLECTION, &teams);
    }

    /// Reload teams from persistence. Returns the team count.
    pub fn restore(&self) -> usize {
        let Some(mut teams) = restore::<Vec<TeamAggregate>>(self.services.persistence.as_ref(), COLLECTION)
        else {
            return 0;
        };
        teams.retain(|t| t.status != EntityStatus::Pending || !t.is_placeholder());
        for team in &mut teams {
            if team.status == EntityStatus::Pending {
                team.status = EntityStatus::Ready;
            }
        }

        let count = teams.len();
        lock(&self.state).teams = teams;
        tracing::debug!(count, "Restored teams");
        count
    }
}
