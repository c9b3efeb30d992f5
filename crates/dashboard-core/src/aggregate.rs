//! Team aggregate and the statistics derived from it.

use std::collections::BTreeMap;
use std::fmt;

use dota_client::models::{LeaguePayload, MatchPayload, Side, TeamPayload};
use dota_client::{EntityKey, Fetchers};
use serde::{Deserialize, Serialize};

use crate::entity::EntityStatus;

/// Natural key of a tracked team: the team within one league.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamKey {
    pub team_id: u64,
    pub league_id: u64,
}

impl TeamKey {
    pub fn new(team_id: u64, league_id: u64) -> Self {
        Self { team_id, league_id }
    }

    pub fn entity_key(&self) -> EntityKey {
        Fetchers::team_key(self.team_id, self.league_id)
    }
}

impl fmt::Display for TeamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.team_id, self.league_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickOrder {
    First,
    Second,
}

/// How one team fared in one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchParticipation {
    pub match_id: u64,
    pub side: Side,
    /// `None` while the match has no recorded winner.
    pub result: Option<MatchResult>,
    pub pick_order: Option<PickOrder>,
    pub opponent_name: Option<String>,
    pub start_time: i64,
    pub duration: u32,
    /// Account ids that played on the team's side.
    #[serde(default)]
    pub account_ids: Vec<u64>,
}

impl MatchParticipation {
    /// Cross-reference the match's team ids with `team_id`.
    ///
    /// Returns `None` when the team is on neither side.
    pub fn derive(team_id: u64, payload: &MatchPayload) -> Option<Self> {
        let side = payload.side_of(team_id)?;
        let result = payload.winner().map(|winner| {
            if winner == side {
                MatchResult::Won
            } else {
                MatchResult::Lost
            }
        });
        let pick_order = payload.first_pick_side().map(|first| {
            if first == side {
                PickOrder::First
            } else {
                PickOrder::Second
            }
        });

        Some(Self {
            match_id: payload.match_id,
            side,
            result,
            pick_order,
            opponent_name: payload.team_name(side.opposite()).map(str::to_string),
            start_time: payload.start_time,
            duration: payload.duration,
            account_ids: payload.account_ids(side),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
}

impl Record {
    fn add(&mut self, result: MatchResult) {
        match result {
            MatchResult::Won => self.wins += 1,
            MatchResult::Lost => self.losses += 1,
        }
    }

    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }

    /// Wins over decided games, 0.0 when none were played.
    pub fn win_rate(&self) -> f64 {
        match self.games() {
            0 => 0.0,
            games => f64::from(self.wins) / f64::from(games),
        }
    }
}

/// Statistics derived from a team's match participations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPerformance {
    pub total_matches: u32,
    pub overall: Record,
    pub radiant: Record,
    pub dire: Record,
    pub first_pick: Record,
    pub second_pick: Record,
    pub average_duration_secs: u32,
}

impl TeamPerformance {
    pub fn from_matches<'a>(matches: impl IntoIterator<Item = &'a MatchParticipation>) -> Self {
        let mut perf = Self::default();
        let mut total_duration: u64 = 0;

        for m in matches {
            perf.total_matches += 1;
            total_duration += u64::from(m.duration);

            let Some(result) = m.result else {
                continue;
            };
            perf.overall.add(result);
            match m.side {
                Side::Radiant => perf.radiant.add(result),
                Side::Dire => perf.dire.add(result),
            }
            match m.pick_order {
                Some(PickOrder::First) => perf.first_pick.add(result),
                Some(PickOrder::Second) => perf.second_pick.add(result),
                None => {}
            }
        }

        if perf.total_matches > 0 {
            perf.average_duration_secs = (total_duration / u64::from(perf.total_matches)) as u32;
        }
        perf
    }

    pub fn win_rate(&self) -> f64 {
        self.overall.win_rate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
    pub id: u64,
    pub name: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueInfo {
    pub id: u64,
    pub name: Option<String>,
}

/// Everything the dashboard shows for one tracked team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAggregate {
    pub team: TeamInfo,
    pub league: LeagueInfo,
    /// Matches listed for the team in this league, in listing order.
    #[serde(default)]
    pub match_ids: Vec<u64>,
    #[serde(default)]
    pub matches: BTreeMap<u64, MatchParticipation>,
    /// Account ids on the team's side of its listed matches, in listing order.
    #[serde(default)]
    pub players: Vec<u64>,
    #[serde(default)]
    pub performance: TeamPerformance,
    pub status: EntityStatus,
    #[serde(default)]
    pub error: Option<String>,
}

impl TeamAggregate {
    /// Optimistic entry shown while the first load runs.
    pub fn placeholder(key: TeamKey) -> Self {
        Self {
            team: TeamInfo {
                id: key.team_id,
                name: None,
                tag: None,
                logo_url: None,
            },
            league: LeagueInfo {
                id: key.league_id,
                name: None,
            },
            match_ids: Vec::new(),
            matches: BTreeMap::new(),
            players: Vec::new(),
            performance: TeamPerformance::default(),
            status: EntityStatus::Pending,
            error: None,
        }
    }

    pub fn key(&self) -> TeamKey {
        TeamKey::new(self.team.id, self.league.id)
    }

    pub fn display_name(&self) -> String {
        self.team
            .name
            .clone()
            .unwrap_or_else(|| format!("Team {}", self.team.id))
    }

    /// True while no fetch has ever populated this entry.
    pub fn is_placeholder(&self) -> bool {
        self.team.name.is_none()
    }

    pub fn is_loading(&self) -> bool {
        self.status == EntityStatus::Pending
    }

    pub(crate) fn apply_team(&mut self, payload: &TeamPayload) {
        self.team.name = Some(payload.name.clone());
        self.team.tag = payload.tag.clone();
        self.team.logo_url = payload.logo_url.clone();
        self.match_ids = payload.match_ids();
        let listed = &self.match_ids;
        self.matches.retain(|id, _| listed.contains(id));
        self.recompute();
    }

    pub(crate) fn apply_league(&mut self, payload: &LeaguePayload) {
        self.league.name = Some(payload.name.clone());
    }

    pub(crate) fn apply_participation(&mut self, participation: MatchParticipation) {
        self.matches.insert(participation.match_id, participation);
        self.recompute();
    }

    fn recompute(&mut self) {
        self.performance = TeamPerformance::from_matches(self.matches.values());

        let listed = self.match_ids.iter().filter_map(|id| self.matches.get(id));
        let unlisted = self
            .matches
            .values()
            .filter(|m| !self.match_ids.contains(&m.match_id));
        let mut players = Vec::new();
        for m in listed.chain(unlisted) {
            for id in &m.account_ids {
                if !players.contains(id) {
                    players.push(*id);
                }
            }
        }
        self.players = players;
    }
}
