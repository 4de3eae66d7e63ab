use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and describe the pipeline metrics.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe_all();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// Register help texts once per process.
pub fn describe_all() {
    static DESCRIBED: OnceCell<()> = OnceCell::new();
    DESCRIBED.get_or_init(|| {
        describe_counter!("news_refresh_total", "Completed refresh cycles");
        describe_counter!("news_refresh_failures_total", "Cycles where no source produced items");
        describe_counter!("news_refresh_skipped_total", "Non-forced refreshes served from cache while in flight");
        describe_histogram!("news_refresh_ms", Unit::Milliseconds, "Refresh cycle duration");
        describe_gauge!("news_last_refresh_ts", Unit::Seconds, "Unix time of the last persisted brief");
        describe_counter!("news_relay_failures_total", "Failed relay attempts");
        describe_counter!("news_feed_exhausted_total", "Feeds for which every relay failed");
        describe_counter!("news_backup_used_total", "Cycles that fell back to the backup bundle");
        describe_counter!("news_feed_items_total", "Items parsed from feeds");
        describe_histogram!("news_parse_ms", Unit::Milliseconds, "Feed parse duration");
        describe_counter!("news_curations_total", "Curate calls by strategy");
        describe_counter!("news_ai_calls_total", "Generator calls by provider");
        describe_counter!("news_ai_fallbacks_total", "Generator results replaced by the heuristic");
        describe_histogram!("news_ai_latency_ms", Unit::Milliseconds, "Generator call latency");
        describe_counter!("news_ai_cooldowns_total", "Generator cooldowns started");
        describe_gauge!("news_ai_cooldown_active", "1 while the generator is cooling down");
        describe_counter!("news_breaking_total", "Briefs classified as breaking");
        describe_counter!("news_health_unhealthy_total", "Health ticks that found the cache unhealthy");
        describe_counter!("news_health_fallbacks_total", "Health recoveries that forced rss_only");
        describe_gauge!("news_recovery_needed", "1 while the recovery panel is shown");
        describe_counter!("news_scheduler_runs_total", "Scheduled refreshes started");
        describe_counter!("news_scheduler_failures_total", "Scheduled refreshes that failed");
    });
}
