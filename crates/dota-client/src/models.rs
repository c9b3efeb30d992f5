//! Payload shapes served by the dashboard backend routes.
//!
//! Team, league and player routes return the dashboard's own camelCase
//! shapes. Match and hero routes pass OpenDota JSON through untouched,
//! so those keep OpenDota's snake_case field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which half of the map a team played on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Radiant,
    Dire,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Radiant => Self::Dire,
            Self::Dire => Self::Radiant,
        }
    }
}

/// Team payload from GET /teams/{id}?leagueId={league}.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPayload {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub matches: Vec<TeamMatchRef>,
}

impl TeamPayload {
    /// Match ids in listing order, without duplicates.
    pub fn match_ids(&self) -> Vec<u64> {
        let mut ids = Vec::with_capacity(self.matches.len());
        for m in &self.matches {
            if !ids.contains(&m.match_id) {
                ids.push(m.match_id);
            }
        }
        ids
    }
}

/// A match listed on a team page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMatchRef {
    pub match_id: u64,
    #[serde(default)]
    pub opponent_name: Option<String>,
}

/// League payload from GET /leagues/{id}.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaguePayload {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub tier: Option<String>,
}

/// OpenDota match detail from GET /matches/{id}.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPayload {
    pub match_id: u64,
    #[serde(default)]
    pub radiant_team_id: Option<u64>,
    #[serde(default)]
    pub dire_team_id: Option<u64>,
    #[serde(default)]
    pub radiant_name: Option<String>,
    #[serde(default)]
    pub dire_name: Option<String>,
    #[serde(default)]
    pub radiant_win: Option<bool>,
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub leagueid: Option<u64>,
    #[serde(default)]
    pub players: Vec<MatchPlayer>,
    #[serde(default)]
    pub picks_bans: Vec<PickBan>,
}

impl MatchPayload {
    /// Side the given team played on, if either side matches.
    pub fn side_of(&self, team_id: u64) -> Option<Side> {
        if self.radiant_team_id == Some(team_id) {
            Some(Side::Radiant)
        } else if self.dire_team_id == Some(team_id) {
            Some(Side::Dire)
        } else {
            None
        }
    }

    pub fn winner(&self) -> Option<Side> {
        self.radiant_win
            .map(|won| if won { Side::Radiant } else { Side::Dire })
    }

    pub fn team_name(&self, side: Side) -> Option<&str> {
        match side {
            Side::Radiant => self.radiant_name.as_deref(),
            Side::Dire => self.dire_name.as_deref(),
        }
    }

    /// Account ids of the players on `side`. Anonymous players are skipped.
    pub fn account_ids(&self, side: Side) -> Vec<u64> {
        self.players
            .iter()
            .filter(|p| p.side() == side)
            .filter_map(|p| p.account_id)
            .collect()
    }

    /// Side that made the first pick of the draft.
    pub fn first_pick_side(&self) -> Option<Side> {
        self.picks_bans
            .iter()
            .filter(|pb| pb.is_pick)
            .min_by_key(|pb| pb.order)
            .and_then(PickBan::side)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.start_time, 0)
    }
}

/// One player row inside an OpenDota match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPlayer {
    #[serde(default)]
    pub account_id: Option<u64>,
    pub player_slot: u16,
    #[serde(default)]
    pub hero_id: u32,
    #[serde(default)]
    pub personaname: Option<String>,
    #[serde(default)]
    pub kills: u32,
    #[serde(default)]
    pub deaths: u32,
    #[serde(default)]
    pub assists: u32,
}

impl MatchPlayer {
    /// Slots 0-127 are radiant, 128+ dire.
    pub fn side(&self) -> Side {
        if self.player_slot < 128 {
            Side::Radiant
        } else {
            Side::Dire
        }
    }
}

/// Draft entry. `team` is 0 for radiant and 1 for dire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickBan {
    pub is_pick: bool,
    pub hero_id: u32,
    pub team: u8,
    pub order: u32,
}

impl PickBan {
    pub fn side(&self) -> Option<Side> {
        match self.team {
            0 => Some(Side::Radiant),
            1 => Some(Side::Dire),
            _ => None,
        }
    }
}

/// Player payload from GET /players/{accountId}.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPayload {
    pub profile: PlayerProfile,
    #[serde(default)]
    pub hero_stats: Vec<PlayerHeroStat>,
    #[serde(default)]
    pub overall_stats: PlayerTotals,
    #[serde(default)]
    pub recent_match_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub account_id: u64,
    #[serde(default)]
    pub personaname: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub rank_tier: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerHeroStat {
    pub hero_id: u32,
    #[serde(default)]
    pub games: u32,
    #[serde(default)]
    pub win: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerTotals {
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
}

/// OpenDota hero constant from GET /heroes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hero {
    pub id: u32,
    pub name: String,
    pub localized_name: String,
    #[serde(default)]
    pub primary_attr: Option<String>,
    #[serde(default)]
    pub attack_type: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opendota_match_deserializes_with_missing_fields() {
        let body = r#"{
            "match_id": 7001,
            "radiant_team_id": 100,
            "dire_team_id": 200,
            "radiant_win": false,
            "start_time": 1700000000,
            "duration": 2400,
            "players": [
                { "account_id": 11, "player_slot": 0, "hero_id": 1 },
                { "account_id": null, "player_slot": 1 },
                { "account_id": 21, "player_slot": 128, "hero_id": 2 }
            ],
            "picks_bans": [
                { "is_pick": false, "hero_id": 5, "team": 0, "order": 0 },
                { "is_pick": true, "hero_id": 9, "team": 1, "order": 1 },
                { "is_pick": true, "hero_id": 1, "team": 0, "order": 2 }
            ]
        }"#;

        let m: MatchPayload = serde_json::from_str(body).unwrap();
        assert_eq!(m.side_of(100), Some(Side::Radiant));
        assert_eq!(m.side_of(200), Some(Side::Dire));
        assert_eq!(m.side_of(300), None);
        assert_eq!(m.winner(), Some(Side::Dire));
        assert_eq!(m.account_ids(Side::Radiant), vec![11]);
        assert_eq!(m.account_ids(Side::Dire), vec![21]);
        assert_eq!(m.first_pick_side(), Some(Side::Dire));
        assert!(m.started_at().is_some());
        assert!(m.radiant_name.is_none());
    }

    #[test]
    fn team_match_ids_are_deduplicated_in_order() {
        let body = r#"{
            "id": 100,
            "name": "Team Spirit",
            "matches": [{ "matchId": 2 }, { "matchId": 1 }, { "matchId": 2 }]
        }"#;
        let team: TeamPayload = serde_json::from_str(body).unwrap();
        assert_eq!(team.match_ids(), vec![2, 1]);
        assert!(team.tag.is_none());
    }
}
