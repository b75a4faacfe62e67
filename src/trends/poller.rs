//! Background trend aggregation loop.

use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

use super::ScamTrendsService;

const STARTUP_DELAY_SECS: u64 = 45;
const DISABLED_RECHECK_SECS: u64 = 600;

pub async fn run_trends_poller(state: Arc<AppState>) {
    tokio::time::sleep(Duration::from_secs(STARTUP_DELAY_SECS)).await;

    let service = ScamTrendsService::new();

    loop {
        let config = state.config_snapshot().scam_trends;

        if !config.enabled || config.feeds.is_empty() {
            tokio::time::sleep(Duration::from_secs(DISABLED_RECHECK_SECS)).await;
            continue;
        }

        match service.sync_once(&state).await {
            Ok((fresh, seen)) => {
                if fresh > 0 {
                    log::info!("Trends: stored {} new items ({} seen)", fresh, seen);
                }
            }
            Err(e) => log::warn!("Trends: sync failed: {}", e),
        }

        tokio::time::sleep(Duration::from_secs(
            config.poll_interval_hours as u64 * 3600,
        ))
        .await;
    }
}
