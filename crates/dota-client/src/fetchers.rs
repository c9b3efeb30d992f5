//! One fetch client per entity type, sharing a transport.

use std::sync::Arc;

use crate::models::{Hero, LeaguePayload, MatchPayload, PlayerPayload, TeamPayload};
use crate::{EntityKey, EntityType, FetchClient, FetchError, Transport};

/// Key of the single heroes-list entry.
pub const HEROES_KEY: &str = "all";

pub struct Fetchers {
    pub teams: FetchClient<TeamPayload>,
    pub leagues: FetchClient<LeaguePayload>,
    pub matches: FetchClient<MatchPayload>,
    pub players: FetchClient<PlayerPayload>,
    pub heroes: FetchClient<Vec<Hero>>,
}

impl Fetchers {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            teams: FetchClient::new(EntityType::Team, transport.clone(), |key| {
                format!("teams/{}?leagueId={}", key.part(0), key.part(1))
            }),
            leagues: FetchClient::new(EntityType::League, transport.clone(), |key| {
                format!("leagues/{}", key.part(0))
            }),
            matches: FetchClient::new(EntityType::Match, transport.clone(), |key| {
                format!("matches/{}", key.part(0))
            }),
            players: FetchClient::new(EntityType::Player, transport.clone(), |key| {
                format!("players/{}", key.part(0))
            }),
            heroes: FetchClient::new(EntityType::Hero, transport, |_| "heroes".to_string()),
        }
    }

    pub fn team_key(team_id: u64, league_id: u64) -> EntityKey {
        EntityKey::join([team_id, league_id])
    }

    pub async fn team(
        &self,
        team_id: u64,
        league_id: u64,
        force: bool,
    ) -> Result<TeamPayload, FetchError> {
        self.teams
            .fetch(&Self::team_key(team_id, league_id), force)
            .await
    }

    pub async fn league(&self, league_id: u64, force: bool) -> Result<LeaguePayload, FetchError> {
        self.leagues.fetch(&EntityKey::single(league_id), force).await
    }

    pub async fn match_detail(
        &self,
        match_id: u64,
        force: bool,
    ) -> Result<MatchPayload, FetchError> {
        self.matches.fetch(&EntityKey::single(match_id), force).await
    }

    pub async fn player(&self, account_id: u64, force: bool) -> Result<PlayerPayload, FetchError> {
        self.players.fetch(&EntityKey::single(account_id), force).await
    }

    pub async fn heroes(&self, force: bool) -> Result<Vec<Hero>, FetchError> {
        self.heroes.fetch(&EntityKey::single(HEROES_KEY), force).await
    }

    /// Drop every cached entry of every entity type.
    pub fn invalidate_all(&self) {
        self.teams.invalidate(None);
        self.leagues.invalidate(None);
        self.matches.invalidate(None);
        self.players.invalidate(None);
        self.heroes.invalidate(None);
    }
}
