//! Civic News Curator: binary entrypoint.
//! Boots the Axum HTTP server, the hourly refresh scheduler and the cache
//! health watcher around one shared `NewsEngine`.

use std::sync::Arc;
use std::time::Duration;

use civic_news_curator::config::NewsConfig;
use civic_news_curator::health::{spawn_health_watcher, HealthWatcher};
use civic_news_curator::metrics::Metrics;
use civic_news_curator::scheduler::spawn_refresh_scheduler;
use civic_news_curator::{router, NewsEngine};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` wins; otherwise info for this crate, warn for the rest.
/// `NEWS_LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("civic_news_curator=info,warn"));

    let json = std::env::var("NEWS_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // The shuttle runtime may already have installed a subscriber.
    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = NewsConfig::load_default()?;
    let metrics = Metrics::init()?;
    let engine = Arc::new(NewsEngine::from_config(&cfg)?);

    spawn_refresh_scheduler(
        engine.clone(),
        Duration::from_secs(cfg.pipeline.refresh_interval_secs.max(1)),
    );
    spawn_health_watcher(
        HealthWatcher::new(engine.clone(), cfg.health.stale_after_minutes),
        Duration::from_secs(cfg.health.interval_secs.max(1)),
    );

    tracing::info!(
        provider = %engine.provider(),
        strict_mode = engine.strict_mode(),
        "civic news curator started"
    );

    let router = router(engine).merge(metrics.router());
    Ok(router.into())
}
