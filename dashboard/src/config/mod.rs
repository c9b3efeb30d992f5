//! Configuration: environment keys, defaults and validation.

pub mod app_config;
pub mod validation;

pub use app_config::AppConfig;

pub const API_BASE_URL: &str = "DASHBOARD_API_BASE_URL";
pub const REQUEST_TIMEOUT_SECS: &str = "DASHBOARD_REQUEST_TIMEOUT_SECS";
pub const DATA_DIR: &str = "DASHBOARD_DATA_DIR";
pub const AUTO_REFRESH_SECS: &str = "DASHBOARD_AUTO_REFRESH_SECS";
pub const FIRST_LOAD_FAILURE: &str = "DASHBOARD_FIRST_LOAD_FAILURE";
pub const TRACKED_TEAMS: &str = "DASHBOARD_TRACKED_TEAMS";

/// Every key [`AppConfig`] reads.
pub const ALL_KEYS: &[&str] = &[
    API_BASE_URL,
    REQUEST_TIMEOUT_SECS,
    DATA_DIR,
    AUTO_REFRESH_SECS,
    FIRST_LOAD_FAILURE,
    TRACKED_TEAMS,
];
