//! Runtime application configuration loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use dashboard_core::{FirstLoadFailure, TeamKey};
use url::Url;

use super::validation::{parse_tracked_teams, validate_setting};
use super::{
    API_BASE_URL, AUTO_REFRESH_SECS, DATA_DIR, FIRST_LOAD_FAILURE, REQUEST_TIMEOUT_SECS,
    TRACKED_TEAMS,
};

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api/";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_AUTO_REFRESH_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: Url,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
    /// `None` disables the background watcher.
    pub auto_refresh_interval: Option<Duration>,
    pub first_load_failure: FirstLoadFailure,
    /// Teams added at startup, in order.
    pub tracked_teams: Vec<TeamKey>,
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `get`. Unset or blank keys take defaults;
    /// set keys must pass [`validate_setting`].
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        let value = |key: &str| -> Result<Option<String>, anyhow::Error> {
            let Some(v) = get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
                return Ok(None);
            };
            validate_setting(key, &v).map_err(|e| anyhow::anyhow!("{key}: {e}"))?;
            Ok(Some(v))
        };

        let api_base_url = match value(API_BASE_URL)? {
            Some(v) => Url::parse(&v).with_context(|| format!("{API_BASE_URL}: invalid URL"))?,
            None => Url::parse(DEFAULT_API_BASE_URL)?,
        };

        let timeout_secs = match value(REQUEST_TIMEOUT_SECS)? {
            Some(v) => v.parse()?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let data_dir = value(DATA_DIR)?
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let refresh_secs: u64 = match value(AUTO_REFRESH_SECS)? {
            Some(v) => v.parse()?,
            None => DEFAULT_AUTO_REFRESH_SECS,
        };

        let first_load_failure = match value(FIRST_LOAD_FAILURE)? {
            Some(v) => v.parse().map_err(|e| anyhow::anyhow!("{FIRST_LOAD_FAILURE}: {e}"))?,
            None => FirstLoadFailure::default(),
        };

        let tracked_teams = match value(TRACKED_TEAMS)? {
            Some(v) => parse_tracked_teams(&v).map_err(|e| anyhow::anyhow!("{TRACKED_TEAMS}: {e}"))?,
            None => Vec::new(),
        };

        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            data_dir,
            auto_refresh_interval: (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs)),
            first_load_failure,
            tracked_teams,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("dashboard.db")
    }
}

/// `~/.dota-dashboard`, or `./.dota-dashboard` without a home directory.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dota-dashboard")
}
