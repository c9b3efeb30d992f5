//! Cross-entity workflows and the single status the UI reads.
//!
//! Adding a team fetches the team and its league, then each listed
//! match, then the players who played on the team's side. Steps run
//! strictly in order; a failed step is recorded and the workflow moves
//! on, so whatever already loaded stays visible.

#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex};

use dota_client::Transport;
use dota_client::models::{Hero, MatchPayload, PlayerPayload};
use serde::Serialize;

use crate::aggregate::TeamKey;
use crate::contexts::{HeroContext, MatchContext, PlayerContext, TeamContext};
use crate::entity::{FirstLoadFailure, LoadOutcome, Services};
use crate::ops::{OperationHandle, lock};
use crate::persist::Persistence;

/// Top-level commands that can be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    AddTeam(TeamKey),
    RefreshTeam(TeamKey),
}

impl Command {
    pub fn team(&self) -> TeamKey {
        match self {
            Self::AddTeam(key) | Self::RefreshTeam(key) => *key,
        }
    }

    fn label(&self) -> String {
        match self {
            Self::AddTeam(key) => format!("Adding team {key}"),
            Self::RefreshTeam(key) => format!("Refreshing team {key}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Completed,
    /// Finished, but at least one match or player failed to load.
    CompletedWithErrors,
    /// The team itself failed to load.
    Failed,
    /// A newer workflow for the same team took over, or the team was removed.
    Superseded,
}

/// Raw progress of the most recently started workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowStatus {
    pub label: Option<String>,
    pub running: bool,
    pub current_step: usize,
    pub total_steps: usize,
    pub error: Option<String>,
}

/// What a progress bar and error banner need.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiStatus {
    pub is_loading: bool,
    /// 0.0 to 1.0.
    pub progress: f64,
    pub error: Option<String>,
    pub can_retry: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub teams: usize,
    pub matches: usize,
    pub players: usize,
    pub heroes: usize,
}

#[derive(Default)]
struct WorkflowState {
    status: WorkflowStatus,
    /// Handle id of the workflow allowed to write `status`.
    owner: Option<u64>,
    owner_team: Option<TeamKey>,
    last_command: Option<Command>,
}

struct CoordinatorInner {
    services: Arc<Services>,
    teams: TeamContext,
    matches: MatchContext,
    players: PlayerContext,
    heroes: HeroContext,
    workflow: Mutex<WorkflowState>,
}

/// Owns every context and the shared services. Cheap to clone.
#[derive(Clone)]
pub struct DataCoordinator {
    inner: Arc<CoordinatorInner>,
}

fn workflow_key(key: TeamKey) -> String {
    format!("workflow:team:{key}")
}

impl DataCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        persistence: Arc<dyn Persistence>,
        first_load_failure: FirstLoadFailure,
    ) -> Self {
        let services = Arc::new(Services::new(transport, persistence, first_load_failure));
        Self {
            inner: Arc::new(CoordinatorInner {
                teams: TeamContext::new(services.clone()),
                matches: MatchContext::new(services.clone()),
                players: PlayerContext::new(services.clone()),
                heroes: HeroContext::new(services.clone()),
                services,
                workflow: Mutex::new(WorkflowState::default()),
            }),
        }
    }

    pub fn services(&self) -> &Services {
        &self.inner.services
    }

    pub fn teams(&self) -> &TeamContext {
        &self.inner.teams
    }

    pub fn matches(&self) -> &MatchContext {
        &self.inner.matches
    }

    pub fn players(&self) -> &PlayerContext {
        &self.inner.players
    }

    pub fn heroes(&self) -> &HeroContext {
        &self.inner.heroes
    }

    /// Reload every context from persistence.
    pub fn restore(&self) -> RestoreSummary {
        let summary = RestoreSummary {
            teams: self.inner.teams.restore(),
            matches: self.inner.matches.restore(),
            players: self.inner.players.restore(),
            heroes: self.inner.heroes.restore(),
        };
        tracing::info!(
            teams = summary.teams,
            matches = summary.matches,
            players = summary.players,
            heroes = summary.heroes,
            "Restored persisted state"
        );
        summary
    }

    pub async fn add_team(&self, team_id: u64, league_id: u64) -> WorkflowOutcome {
        self.run(Command::AddTeam(TeamKey::new(team_id, league_id)))
            .await
    }

    /// Force-refetch a tracked team, its matches and its players.
    pub async fn refresh_team(&self, team_id: u64, league_id: u64) -> WorkflowOutcome {
        let key = TeamKey::new(team_id, league_id);
        let _refreshing = self.inner.services.refreshing.mark(&key.to_string());
        self.run(Command::RefreshTeam(key)).await
    }

    /// Re-run the last top-level command, superseding whatever is left of it.
    pub async fn retry(&self) -> Option<WorkflowOutcome> {
        let command = lock(&self.inner.workflow).last_command?;
        Some(match command {
            Command::AddTeam(key) => self.add_team(key.team_id, key.league_id).await,
            Command::RefreshTeam(key) => self.refresh_team(key.team_id, key.league_id).await,
        })
    }

    /// Refresh every tracked team that has no workflow of its own running.
    /// Returns how many teams were refreshed.
    ///
    /// Background passes never become the retryable command and never
    /// write the UI status.
    pub async fn refresh_idle_teams(&self) -> usize {
        let mut refreshed = 0;
        for key in self.inner.teams.keys() {
            if self.is_refreshing(key) {
                tracing::debug!(team = %key, "Skipping team under manual refresh");
                continue;
            }
            if self.inner.services.tracker.has_ongoing(&workflow_key(key)) {
                tracing::debug!(team = %key, "Skipping team with a workflow in flight");
                continue;
            }
            self.run_background(key).await;
            refreshed += 1;
        }
        refreshed
    }

    pub fn is_refreshing(&self, key: TeamKey) -> bool {
        self.inner.services.refreshing.is_refreshing(&key.to_string())
    }

    /// Stop tracking a team and drop matches and players nothing else uses.
    pub fn remove_team(&self, team_id: u64, league_id: u64) -> bool {
        let key = TeamKey::new(team_id, league_id);
        self.inner.services.tracker.cancel(&workflow_key(key));
        {
            let mut wf = lock(&self.inner.workflow);
            if wf.owner_team == Some(key) {
                wf.status.running = false;
                wf.owner = None;
                wf.owner_team = None;
            }
        }

        if self.inner.teams.remove(key).is_none() {
            return false;
        }
        self.prune_orphans();
        tracing::info!(team = %key, "Team removed");
        true
    }

    fn prune_orphans(&self) {
        let match_ids = self.inner.teams.referenced_match_ids();
        let removed_matches = self.inner.matches.retain(|id| match_ids.contains(&id));
        let player_ids = self.inner.teams.referenced_player_ids();
        let removed_players = self.inner.players.retain(|id| player_ids.contains(&id));
        if !removed_matches.is_empty() || !removed_players.is_empty() {
            tracing::debug!(
                matches = removed_matches.len(),
                players = removed_players.len(),
                "Pruned orphaned entities"
            );
        }
    }

    pub async fn load_heroes(&self, force: bool) -> LoadOutcome<Vec<Hero>> {
        self.inner.heroes.load(force).await
    }

    async fn run(&self, command: Command) -> WorkflowOutcome {
        let key = command.team();
        let handle = self.inner.services.tracker.begin(&workflow_key(key));
        {
            let mut wf = lock(&self.inner.workflow);
            wf.owner = Some(handle.id());
            wf.owner_team = Some(key);
            wf.last_command = Some(command);
            wf.status = WorkflowStatus {
                label: Some(command.label()),
                running: true,
                current_step: 0,
                total_steps: 1,
                error: None,
            };
        }

        let force = matches!(command, Command::RefreshTeam(_));
        let outcome = self.team_workflow(&handle, key, force).await;

        if outcome != WorkflowOutcome::Superseded {
            self.prune_orphans();
            self.update_status(&handle, |s| {
                s.running = false;
                s.current_step = s.total_steps;
            });
            tracing::info!(team = %key, ?outcome, "Team workflow finished");
        }
        self.inner.services.tracker.end(&handle);
        outcome
    }

    /// Forced refresh that leaves `last_command` and the UI status alone.
    async fn run_background(&self, key: TeamKey) -> WorkflowOutcome {
        let handle = self.inner.services.tracker.begin(&workflow_key(key));
        let outcome = self.team_workflow(&handle, key, true).await;
        if outcome != WorkflowOutcome::Superseded {
            self.prune_orphans();
            tracing::debug!(team = %key, ?outcome, "Background refresh finished");
        }
        self.inner.services.tracker.end(&handle);
        outcome
    }

    async fn team_workflow(
        &self,
        handle: &OperationHandle,
        key: TeamKey,
        force: bool,
    ) -> WorkflowOutcome {
        let teams = &self.inner.teams;
        let loaded = if force {
            teams.refresh(key).await
        } else {
            teams.add(key).await
        };
        if handle.is_cancelled() {
            return WorkflowOutcome::Superseded;
        }

        let aggregate = match loaded {
            LoadOutcome::Ready(aggregate) => aggregate,
            LoadOutcome::Failed(message) => {
                self.record_error(handle, message);
                return WorkflowOutcome::Failed;
            }
            LoadOutcome::Superseded => return WorkflowOutcome::Superseded,
        };

        let match_ids = aggregate.match_ids;
        self.update_status(handle, |s| {
            s.current_step = 1;
            s.total_steps = 1 + 2 * match_ids.len();
        });

        let mut had_errors = false;
        for match_id in match_ids {
            if handle.is_cancelled() {
                return WorkflowOutcome::Superseded;
            }
            let fetched = self.load_match(match_id, force).await;
            if handle.is_cancelled() {
                return WorkflowOutcome::Superseded;
            }
            self.advance(handle);

            let payload = match fetched {
                Ok(payload) => payload,
                Err(message) => {
                    had_errors = true;
                    self.record_error(handle, message);
                    self.advance(handle);
                    continue;
                }
            };

            match teams.apply_match(key, &payload) {
                Some(participation) => {
                    for account_id in payload.account_ids(participation.side) {
                        if handle.is_cancelled() {
                            return WorkflowOutcome::Superseded;
                        }
                        if let LoadOutcome::Failed(message) =
                            self.load_player(account_id, force).await
                        {
                            had_errors = true;
                            self.record_error(handle, message);
                        }
                    }
                }
                None => {
                    tracing::warn!(
                        team = %key,
                        match_id,
                        radiant = ?payload.radiant_team_id,
                        dire = ?payload.dire_team_id,
                        "Team is on neither side of match; skipping player extraction"
                    );
                }
            }
            self.advance(handle);
        }

        if had_errors {
            WorkflowOutcome::CompletedWithErrors
        } else {
            WorkflowOutcome::Completed
        }
    }

    async fn load_match(&self, match_id: u64, force: bool) -> Result<MatchPayload, String> {
        let matches = &self.inner.matches;
        let outcome = if force && matches.contains(match_id) {
            matches.refresh(match_id).await
        } else {
            matches.add(match_id).await
        };
        match outcome {
            LoadOutcome::Ready(payload) => Ok(payload),
            LoadOutcome::Failed(message) => Err(message),
            // Another workflow owns this match's entry; read the payload
            // through the cache instead.
            LoadOutcome::Superseded => self
                .inner
                .services
                .fetchers
                .match_detail(match_id, false)
                .await
                .map_err(|e| e.to_string()),
        }
    }

    async fn load_player(&self, account_id: u64, force: bool) -> LoadOutcome<PlayerPayload> {
        let players = &self.inner.players;
        if force && players.contains(account_id) {
            players.refresh(account_id).await
        } else {
            players.add(account_id).await
        }
    }

    fn update_status(&self, handle: &OperationHandle, f: impl FnOnce(&mut WorkflowStatus)) {
        let mut wf = lock(&self.inner.workflow);
        if wf.owner == Some(handle.id()) {
            f(&mut wf.status);
        }
    }

    fn advance(&self, handle: &OperationHandle) {
        self.update_status(handle, |s| {
            s.current_step = (s.current_step + 1).min(s.total_steps);
        });
    }

    fn record_error(&self, handle: &OperationHandle, message: String) {
        self.update_status(handle, |s| s.error = Some(message));
    }

    pub fn workflow_status(&self) -> WorkflowStatus {
        lock(&self.inner.workflow).status.clone()
    }

    /// Derive the UI status. No side effects.
    pub fn get_ui_status(&self) -> UiStatus {
        let (status, has_command) = {
            let wf = lock(&self.inner.workflow);
            (wf.status.clone(), wf.last_command.is_some())
        };
        let inner = &self.inner;

        let is_loading = status.running
            || inner.teams.is_loading()
            || inner.matches.is_loading()
            || inner.players.is_loading()
            || inner.heroes.is_loading();
        let progress = match status.total_steps {
            0 => 0.0,
            total => (status.current_step as f64 / total as f64).clamp(0.0, 1.0),
        };
        let error = status
            .error
            .or_else(|| inner.teams.error_state())
            .or_else(|| inner.matches.error_state())
            .or_else(|| inner.players.error_state())
            .or_else(|| inner.heroes.error_state());
        let can_retry = !is_loading && error.is_some() && has_command;

        UiStatus {
            is_loading,
            progress,
            error,
            can_retry,
        }
    }

    /// Clear the selection in every context. Data stays.
    pub fn clear_all_contexts(&self) {
        self.inner.teams.select(None);
        self.inner.matches.select(None);
        self.inner.players.select(None);
        self.inner.heroes.select(None);
    }

    pub fn clear_all_errors(&self) {
        self.inner.teams.clear_errors();
        self.inner.matches.clear_errors();
        self.inner.players.clear_errors();
        self.inner.heroes.clear_errors();
        lock(&self.inner.workflow).status.error = None;
    }

    /// Cancel every operation in flight.
    pub fn shutdown(&self) {
        self.inner.services.tracker.cancel_all();
    }
}
