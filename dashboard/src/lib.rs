pub mod background;
pub mod config;

use std::sync::Arc;

use dashboard_core::{DataCoordinator, EntityStatus};
use dashboard_db::Database;
use dota_client::HttpTransport;

use config::AppConfig;

/// Load .env from multiple candidate paths.
pub fn load_dotenv() {
    let candidates = [".env", "../.env", "../../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}

/// Load config, open the snapshot database and build the coordinator.
pub fn init_foundation() -> Result<(DataCoordinator, AppConfig), anyhow::Error> {
    load_dotenv();
    let config = AppConfig::from_env()?;

    std::fs::create_dir_all(&config.data_dir)?;
    let db_path = config.db_path();
    tracing::info!("Opening database at {}", db_path.display());
    let db = Database::open(&db_path)?;

    let transport = HttpTransport::new(config.api_base_url.clone(), config.request_timeout)?;
    let coordinator = DataCoordinator::new(
        Arc::new(transport),
        Arc::new(db),
        config.first_load_failure,
    );

    tracing::info!(
        api = %config.api_base_url,
        first_load_failure = %config.first_load_failure,
        tracked = config.tracked_teams.len(),
        "Configuration loaded"
    );
    Ok((coordinator, config))
}

/// Log one line per tracked team and the overall UI status.
pub fn log_summary(coordinator: &DataCoordinator) {
    for team in coordinator.teams().teams() {
        match team.status {
            EntityStatus::Failed => tracing::warn!(
                team = %team.key(),
                error = team.error.as_deref().unwrap_or("unknown error"),
                "{} failed to load",
                team.display_name()
            ),
            _ => tracing::info!(
                team = %team.key(),
                league = team.league.name.as_deref().unwrap_or("-"),
                matches = team.performance.total_matches,
                players = team.players.len(),
                win_rate = team.performance.win_rate(),
                "{}",
                team.display_name()
            ),
        }
    }

    let status = coordinator.get_ui_status();
    match serde_json::to_string(&status) {
        Ok(json) => tracing::info!("UI status: {json}"),
        Err(e) => tracing::warn!("Failed to serialize UI status: {e}"),
    }
}
