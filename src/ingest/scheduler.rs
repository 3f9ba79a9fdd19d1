// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::ScheduleConfig;
use crate::monitor::DiscoveryMonitor;

/// Spawn the periodic forced refresh. The first tick fires immediately; missed
/// ticks are skipped. Returns `None` when scheduling is disabled.
pub fn spawn_refresh_scheduler(
    monitor: Arc<DiscoveryMonitor>,
    cfg: &ScheduleConfig,
) -> Option<JoinHandle<()>> {
    if !cfg.enabled {
        tracing::info!(target: "ingest", "refresh scheduler disabled");
        return None;
    }
    let period = Duration::from_secs(cfg.refresh_interval_secs.max(1));

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let feed = monitor.fetch(true).await;
            tracing::info!(
                target: "ingest",
                count = feed.discoveries.len(),
                origin = feed.origin.as_str(),
                "scheduled refresh tick"
            );
        }
    }))
}
