//! Headless driver: restores state, tracks the configured teams and keeps
//! them fresh until Ctrl+C.

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use dashboard_core::WorkflowOutcome;
use dota_dashboard_lib::background;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting Dota dashboard (headless mode)");

    let (coordinator, config) = dota_dashboard_lib::init_foundation()?;
    coordinator.restore();

    if let Some(e) = coordinator.load_heroes(false).await.error() {
        tracing::warn!("Heroes unavailable: {e}");
    }

    for key in &config.tracked_teams {
        match coordinator.add_team(key.team_id, key.league_id).await {
            WorkflowOutcome::Completed => tracing::info!(team = %key, "Team ready"),
            WorkflowOutcome::CompletedWithErrors => {
                tracing::warn!(team = %key, "Team loaded with missing matches or players")
            }
            WorkflowOutcome::Failed => tracing::error!(team = %key, "Team failed to load"),
            WorkflowOutcome::Superseded => {}
        }
    }
    dota_dashboard_lib::log_summary(&coordinator);

    let shutdown_token = CancellationToken::new();
    let watcher = config.auto_refresh_interval.map(|interval| {
        tokio::spawn(background::auto_refresh_loop(
            coordinator.clone(),
            interval,
            shutdown_token.clone(),
        ))
    });

    tracing::info!("Headless dashboard running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    shutdown_token.cancel();
    coordinator.shutdown();
    if let Some(handle) = watcher {
        if let Err(e) = handle.await {
            tracing::warn!("Auto-refresh task ended abnormally: {e}");
        }
    }
    dota_dashboard_lib::log_summary(&coordinator);
    Ok(())
}
