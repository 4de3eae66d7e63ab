// src/health.rs
//! Cache freshness watcher.
//!
//! On an unhealthy cache: forced refresh; if that fails, fall back to the
//! deterministic `rss_only` strict mode and retry once. Whatever the outcome,
//! the engine's recovery flag ends up reflecting the final classification.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use tokio::task::JoinHandle;

use crate::cache::CachedPayload;
use crate::engine::NewsEngine;
use crate::settings::{self, ProviderPreference};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheHealth {
    Fresh { age_minutes: i64 },
    Missing,
    UnparseableStamp,
    Stale { age_minutes: i64 },
}

impl CacheHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, CacheHealth::Fresh { .. })
    }

    /// Short label for logs and the recovery panel.
    pub fn reason(&self) -> &'static str {
        match self {
            CacheHealth::Fresh { .. } => "Fresh",
            CacheHealth::Missing => "Unavailable",
            CacheHealth::UnparseableStamp => "Unreadable",
            CacheHealth::Stale { .. } => "Stale",
        }
    }
}

/// A payload whose age reaches `stale_after` is stale.
pub fn classify(
    payload: Option<&CachedPayload>,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> CacheHealth {
    let Some(p) = payload else {
        return CacheHealth::Missing;
    };
    let Some(at) = p.stamped_at() else {
        return CacheHealth::UnparseableStamp;
    };
    let age = now - at;
    if age >= stale_after {
        CacheHealth::Stale {
            age_minutes: age.num_minutes(),
        }
    } else {
        CacheHealth::Fresh {
            age_minutes: age.num_minutes(),
        }
    }
}

pub struct HealthWatcher {
    engine: Arc<NewsEngine>,
    stale_after: Duration,
}

impl HealthWatcher {
    pub fn new(engine: Arc<NewsEngine>, stale_after_minutes: i64) -> Self {
        Self {
            engine,
            stale_after: Duration::minutes(stale_after_minutes),
        }
    }

    pub fn classify_at(&self, now: DateTime<Utc>) -> CacheHealth {
        classify(self.engine.latest().as_ref(), now, self.stale_after)
    }

    pub async fn check(&self) -> CacheHealth {
        self.check_at(Utc::now()).await
    }

    /// One watcher tick with an explicit clock.
    pub async fn check_at(&self, now: DateTime<Utc>) -> CacheHealth {
        let before = self.classify_at(now);
        if before.is_healthy() {
            self.engine.set_recovery_needed(false);
            return before;
        }

        counter!("news_health_unhealthy_total", "reason" => before.reason()).increment(1);
        tracing::warn!(health = ?before, "cached brief unhealthy, forcing refresh");

        if let Err(e) = self.engine.refresh_at(true, now).await {
            tracing::warn!(error = %e, "forced refresh failed, falling back to rss_only");
            counter!("news_health_fallbacks_total").increment(1);
            let store = self.engine.store().as_ref();
            if let Err(e) = settings::set_provider(store, &ProviderPreference::RssOnly)
                .and_then(|_| settings::set_strict_mode(store, true))
            {
                tracing::warn!(error = %e, "could not persist rss_only fallback");
            }
            if let Err(e) = self.engine.refresh_at(true, now).await {
                tracing::warn!(error = %e, "rss_only retry failed");
            }
        }

        let after = self.classify_at(now);
        self.engine.set_recovery_needed(!after.is_healthy());
        after
    }
}

/// Run `check` every `interval` until the task is aborted.
pub fn spawn_health_watcher(watcher: HealthWatcher, interval: StdDuration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let health = watcher.check().await;
            tracing::debug!(?health, "health tick");
        }
    })
}
