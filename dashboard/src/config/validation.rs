//! Setting value validation.

use std::sync::LazyLock;

use dashboard_core::{FirstLoadFailure, TeamKey};
use regex::Regex;
use url::Url;

use super::{
    API_BASE_URL, AUTO_REFRESH_SECS, DATA_DIR, FIRST_LOAD_FAILURE, REQUEST_TIMEOUT_SECS,
    TRACKED_TEAMS,
};

static RE_TEAM_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,19}):(\d{1,19})\s*$").unwrap());

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        API_BASE_URL => {
            let url = Url::parse(value).map_err(|e| format!("invalid URL: {e}"))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err("must be an http or https URL".into());
            }
        }
        REQUEST_TIMEOUT_SECS => validate_int_range(value, 1, 120)?,
        DATA_DIR => {
            if value.trim().is_empty() {
                return Err("must not be empty".into());
            }
        }
        AUTO_REFRESH_SECS => {
            let v: u64 = value.parse().map_err(|_| "must be an integer")?;
            if v != 0 && !(30..=86_400).contains(&v) {
                return Err("must be 0 (disabled) or between 30 and 86400".into());
            }
        }
        FIRST_LOAD_FAILURE => {
            value.parse::<FirstLoadFailure>()?;
        }
        TRACKED_TEAMS => {
            parse_tracked_teams(value)?;
        }
        _ => {}
    }
    Ok(())
}

/// Parse a comma list of `teamId:leagueId`. Empty entries are skipped.
pub fn parse_tracked_teams(value: &str) -> Result<Vec<TeamKey>, String> {
    let mut keys = Vec::new();
    for entry in value.split(',').filter(|e| !e.trim().is_empty()) {
        let caps = RE_TEAM_KEY
            .captures(entry)
            .ok_or_else(|| format!("'{}' is not teamId:leagueId", entry.trim()))?;
        let team_id = caps[1]
            .parse()
            .map_err(|_| format!("team id out of range in '{}'", entry.trim()))?;
        let league_id = caps[2]
            .parse()
            .map_err(|_| format!("league id out of range in '{}'", entry.trim()))?;
        let key = TeamKey::new(team_id, league_id);
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    Ok(keys)
}

fn validate_int_range(value: &str, min: u64, max: u64) -> Result<(), String> {
    let v: u64 = value.parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}
