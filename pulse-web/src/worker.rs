//! Periodic metrics logging
//!
//! Polls the repository on a fixed interval and logs one summary line per
//! session. Each tick reads a consistent snapshot under the repository's
//! shared lock; no core logic lives here.

use crate::PulseRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Default polling period
pub const METRICS_PERIOD: Duration = Duration::from_secs(30);

/// Spawn the metrics poller
pub fn spawn(repository: Arc<PulseRepository>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup stays quiet
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let summaries = repository.summaries();
            if summaries.is_empty() {
                continue;
            }

            for summary in summaries {
                info!(
                    "Pulse snapshot {}: {:.1} avg, {} responses, {:.0}% positive",
                    summary.code,
                    summary.average_rating,
                    summary.total_responses,
                    summary.positive_share * 100.0
                );
            }
        }
    })
}
