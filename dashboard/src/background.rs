//! Background task loops: periodic team auto-refresh.

use std::time::Duration;

use dashboard_core::DataCoordinator;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

async fn sleep_or_cancel(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}

/// Periodically refresh every tracked team.
///
/// Teams under a manual refresh are left alone for that pass.
pub async fn auto_refresh_loop(
    coordinator: DataCoordinator,
    interval: Duration,
    shutdown_token: CancellationToken,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Auto-refresh loop started");

    loop {
        if sleep_or_cancel(&shutdown_token, interval).await {
            tracing::info!("Auto-refresh loop stopped (shutdown)");
            return;
        }

        let refreshed = tokio::select! {
            _ = shutdown_token.cancelled() => {
                tracing::info!("Auto-refresh loop stopped mid-pass (shutdown)");
                return;
            }
            n = coordinator.refresh_idle_teams() => n,
        };

        let status = coordinator.get_ui_status();
        match status.error {
            Some(e) => tracing::warn!(refreshed, "Auto-refresh finished with errors: {e}"),
            None => tracing::debug!(refreshed, "Auto-refresh pass finished"),
        }
    }
}
