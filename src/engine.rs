//! # News Engine
//! Owns the store, fetcher, curator, cache and refresh gate, and runs one
//! pipeline cycle per `refresh` call:
//!
//! gate → choose sources → fetch + parse (declared order) → backup bundle if
//! nothing → curate headline batch → curate per source → stamp → persist.
//!
//! Only total failure (no source produced anything) reaches the caller; the
//! cached payload is left untouched in that case.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};

use crate::cache::{BriefCache, CachedPayload};
use crate::config::{NewsConfig, PipelineConfig};
use crate::curate::generator::{build_generator, DynGenerator};
use crate::curate::reliability::ReliabilityTable;
use crate::curate::Curator;
use crate::error::NewsError;
use crate::gate::{Cooldown, RefreshGate};
use crate::ingest::collect_with_backup;
use crate::ingest::relay::RelayFetcher;
use crate::ingest::sources::choose_sources;
use crate::ingest::types::FeedFetcher;
use crate::settings::{self, ProviderPreference};
use crate::store::{FileStore, KvStore, MemoryStore};

pub struct NewsEngine {
    store: Arc<dyn KvStore>,
    fetcher: Arc<dyn FeedFetcher>,
    curator: Curator,
    cache: BriefCache,
    gate: RefreshGate,
    cooldown: Arc<Cooldown>,
    pipeline: PipelineConfig,
    recovery: AtomicBool,
}

impl NewsEngine {
    pub fn new(
        store: Arc<dyn KvStore>,
        fetcher: Arc<dyn FeedFetcher>,
        generator: DynGenerator,
        reliability: Arc<ReliabilityTable>,
        pipeline: PipelineConfig,
        cooldown_minutes: u64,
    ) -> Self {
        let cooldown = Arc::new(Cooldown::from_minutes(store.clone(), cooldown_minutes));
        let curator = Curator::new(store.clone(), cooldown.clone(), generator, reliability);
        Self {
            cache: BriefCache::new(store.clone()),
            store,
            fetcher,
            curator,
            gate: RefreshGate::new(),
            cooldown,
            pipeline,
            recovery: AtomicBool::new(false),
        }
    }

    /// Production wiring: file (or memory) store, relay fetcher, configured
    /// generator, reliability overrides.
    pub fn from_config(cfg: &NewsConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn KvStore> = if cfg.storage.store_path.trim().is_empty() {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(FileStore::open(&cfg.storage.store_path))
        };
        let fetcher = RelayFetcher::from_config(&cfg.relay).context("building relay fetcher")?;
        let generator = build_generator(&cfg.ai);
        let reliability = ReliabilityTable::load_from_file(Path::new(&cfg.storage.reliability_path));

        tracing::info!(
            relays = fetcher.templates().len(),
            generator = generator.name(),
            ai_enabled = cfg.ai.enabled,
            key = %cfg.ai.key_fingerprint(),
            "news engine configured"
        );

        Ok(Self::new(
            store,
            Arc::new(fetcher),
            generator,
            Arc::new(reliability),
            cfg.pipeline.clone(),
            cfg.ai.cooldown_minutes,
        ))
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn cooldown(&self) -> &Cooldown {
        &self.cooldown
    }

    pub fn curator(&self) -> &Curator {
        &self.curator
    }

    pub fn latest(&self) -> Option<CachedPayload> {
        self.cache.load()
    }

    pub fn provider(&self) -> ProviderPreference {
        settings::provider(self.store.as_ref())
    }

    pub fn strict_mode(&self) -> bool {
        settings::strict_mode(self.store.as_ref())
    }

    pub fn is_refreshing(&self) -> bool {
        self.gate.is_in_flight()
    }

    /// Raised by the health watcher when recovery did not produce a fresh
    /// payload; presenters show the recovery panel while it is set.
    pub fn recovery_needed(&self) -> bool {
        self.recovery.load(Ordering::SeqCst)
    }

    pub fn set_recovery_needed(&self, on: bool) {
        let was = self.recovery.swap(on, Ordering::SeqCst);
        if was != on {
            gauge!("news_recovery_needed").set(if on { 1.0 } else { 0.0 });
            if on {
                tracing::warn!("news recovery needed");
            } else {
                tracing::info!("news recovered");
            }
        }
    }

    pub async fn refresh(&self, force: bool) -> Result<CachedPayload, NewsError> {
        self.refresh_at(force, Utc::now()).await
    }

    /// One cycle with an explicit clock. A non-forced call while another
    /// cycle is in flight returns the cached payload without running.
    pub async fn refresh_at(
        &self,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<CachedPayload, NewsError> {
        let Some(_guard) = self.gate.try_enter(force) else {
            counter!("news_refresh_skipped_total").increment(1);
            tracing::debug!("refresh in flight, serving cached brief");
            return self.cache.load_required();
        };

        let t0 = Instant::now();
        let pref = self.provider();
        let sources = choose_sources(&pref);
        let items = collect_with_backup(
            self.fetcher.as_ref(),
            sources,
            self.pipeline.max_items_per_feed,
        )
        .await;

        if items.is_empty() {
            counter!("news_refresh_failures_total").increment(1);
            tracing::warn!(provider = %pref, sources = sources.len(), "refresh produced no items");
            return Err(NewsError::AllSourcesFailed);
        }

        let batch = &items[..items.len().min(self.pipeline.max_items_curate)];
        let curated = self.curator.curate(batch, now).await;
        let by_source = self
            .curator
            .curate_by_source(&items, self.pipeline.per_source_cap(), now)
            .await;

        let payload = CachedPayload::new(curated, by_source, now);
        self.cache.save(&payload)?;

        if payload.curated.is_breaking() {
            counter!("news_breaking_total").increment(1);
            tracing::warn!(
                brief = %payload.curated.brief,
                impact = payload.curated.impact_level.as_str(),
                sentiment = payload.curated.sentiment.as_str(),
                credibility = payload.curated.credibility_score,
                "breaking news"
            );
        }

        let ms = t0.elapsed().as_secs_f64() * 1000.0;
        histogram!("news_refresh_ms").record(ms);
        counter!("news_refresh_total").increment(1);
        gauge!("news_last_refresh_ts").set(now.timestamp() as f64);
        tracing::info!(
            provider = %pref,
            items = items.len(),
            sources = payload.by_source.len(),
            stamp = %payload.stamp,
            elapsed_ms = ms as u64,
            "brief refreshed"
        );
        Ok(payload)
    }

    /// Settings change: store the preference, strict mode follows `rss_only`,
    /// cooldown and cached brief are dropped, then a forced refresh runs.
    pub async fn reconfigure_provider(
        &self,
        pref: ProviderPreference,
    ) -> Result<CachedPayload, NewsError> {
        settings::set_provider(self.store.as_ref(), &pref)?;
        settings::set_strict_mode(self.store.as_ref(), pref == ProviderPreference::RssOnly)?;
        self.cooldown.clear();
        self.cache.clear()?;
        tracing::info!(provider = %pref, "provider reconfigured");
        self.refresh(true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curate::generator::{MockGenerator, MockReply};
    use crate::store::LATEST_BRIEF_KEY;
    use async_trait::async_trait;

    struct StaticFetcher(Option<&'static str>);

    #[async_trait]
    impl FeedFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String, NewsError> {
            match self.0 {
                Some(body) => Ok(body.to_string()),
                None => Err(NewsError::FetchExhausted {
                    target: url.to_string(),
                    attempts: 1,
                }),
            }
        }
        fn name(&self) -> &'static str {
            "static"
        }
    }

    const RSS: &str = r#"<rss><channel>
<item><title>Alpha wins election</title><link>https://e/1</link></item>
<item><title>Markets rally</title><link>https://e/2</link></item>
</channel></rss>"#;

    fn engine(body: Option<&'static str>) -> NewsEngine {
        NewsEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(StaticFetcher(body)),
            Arc::new(MockGenerator::always(MockReply::Text("{}".into()))),
            Arc::new(ReliabilityTable::default_seed()),
            PipelineConfig::default(),
            10,
        )
    }

    #[tokio::test]
    async fn refresh_persists_a_stamped_payload() {
        let e = engine(Some(RSS));
        let p = e.refresh(false).await.unwrap();
        assert_eq!(p.curated.brief, "Alpha wins election");
        // every source in the enhanced bundle answered the same two items
        assert_eq!(p.by_source.len(), 8);
        assert_eq!(e.latest(), Some(p));
        assert!(!e.is_refreshing());
    }

    #[tokio::test]
    async fn total_failure_leaves_cache_untouched() {
        let e = engine(None);
        e.store().set(LATEST_BRIEF_KEY, "sentinel").unwrap();
        assert!(matches!(
            e.refresh(true).await,
            Err(NewsError::AllSourcesFailed)
        ));
        assert_eq!(e.store().get(LATEST_BRIEF_KEY).as_deref(), Some("sentinel"));
        assert!(!e.is_refreshing());
    }

    #[tokio::test]
    async fn reconfigure_sets_strict_and_clears_cooldown() {
        let e = engine(Some(RSS));
        e.cooldown().start(Utc::now());
        let p = e
            .reconfigure_provider(ProviderPreference::TechBundle)
            .await
            .unwrap();
        assert_eq!(e.provider(), ProviderPreference::TechBundle);
        assert!(!e.strict_mode());
        assert!(!e.cooldown().is_active(Utc::now()));
        assert_eq!(p.by_source.len(), 3);
    }

    #[test]
    fn recovery_flag_toggles() {
        let e = engine(None);
        assert!(!e.recovery_needed());
        e.set_recovery_needed(true);
        assert!(e.recovery_needed());
        e.set_recovery_needed(false);
        assert!(!e.recovery_needed());
    }
}
