// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::engine::NewsEngine;

/// Hourly (by default) forced refresh. The first tick fires immediately so a
/// fresh deployment has a brief without waiting a full interval.
pub fn spawn_refresh_scheduler(engine: Arc<NewsEngine>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            counter!("news_scheduler_runs_total").increment(1);
            match engine.refresh(true).await {
                Ok(p) => tracing::info!(target: "scheduler", stamp = %p.stamp, "scheduled refresh done"),
                Err(e) => {
                    counter!("news_scheduler_failures_total").increment(1);
                    tracing::warn!(target: "scheduler", error = %e, "scheduled refresh failed");
                }
            }
        }
    })
}
