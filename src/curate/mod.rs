// src/curate/mod.rs
pub mod ai;
pub mod brief;
pub mod generator;
pub mod heuristic;
pub mod reliability;
pub mod repair;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;

pub use brief::{BriefLink, CuratedBrief, ImpactLevel, Regions, Sentiment, SourceBrief};

use crate::curate::ai::AiStrategy;
use crate::curate::generator::DynGenerator;
use crate::curate::heuristic::HeuristicStrategy;
use crate::curate::reliability::ReliabilityTable;
use crate::gate::Cooldown;
use crate::ingest::types::FeedItem;
use crate::settings;
use crate::store::KvStore;

/// Turns a batch of feed items into one brief. Never fails: every
/// implementation degrades to heuristic content on its own.
#[async_trait]
pub trait CurationStrategy: Send + Sync {
    async fn curate(&self, items: &[FeedItem], now: DateTime<Utc>) -> CuratedBrief;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Strict,
    Loose,
    Ai,
}

/// Strict mode wins over everything; an active cooldown skips the generator.
pub fn select_strategy(strict: bool, cooldown_active: bool) -> StrategyKind {
    if strict {
        StrategyKind::Strict
    } else if cooldown_active {
        StrategyKind::Loose
    } else {
        StrategyKind::Ai
    }
}

pub struct Curator {
    store: Arc<dyn KvStore>,
    cooldown: Arc<Cooldown>,
    strict: HeuristicStrategy,
    loose: HeuristicStrategy,
    ai: AiStrategy,
}

impl Curator {
    pub fn new(
        store: Arc<dyn KvStore>,
        cooldown: Arc<Cooldown>,
        generator: DynGenerator,
        reliability: Arc<ReliabilityTable>,
    ) -> Self {
        let ai = AiStrategy::new(
            generator,
            cooldown.clone(),
            HeuristicStrategy::loose(reliability.clone()),
        );
        Self {
            store,
            cooldown,
            strict: HeuristicStrategy::strict(reliability.clone()),
            loose: HeuristicStrategy::loose(reliability),
            ai,
        }
    }

    /// Policy inputs are re-read on every call, so a cooldown started by an
    /// earlier call in the same cycle is honoured.
    pub fn strategy_at(&self, now: DateTime<Utc>) -> &dyn CurationStrategy {
        let kind = select_strategy(
            settings::strict_mode(self.store.as_ref()),
            self.cooldown.is_active(now),
        );
        match kind {
            StrategyKind::Strict => &self.strict,
            StrategyKind::Loose => &self.loose,
            StrategyKind::Ai => &self.ai,
        }
    }

    pub async fn curate(&self, items: &[FeedItem], now: DateTime<Utc>) -> CuratedBrief {
        let strategy = self.strategy_at(now);
        counter!("news_curations_total", "strategy" => strategy.name()).increment(1);
        tracing::debug!(strategy = strategy.name(), items = items.len(), "curating batch");
        strategy.curate(items, now).await
    }

    /// One brief per source, sources in first-seen order, each group capped
    /// at `cap` items.
    pub async fn curate_by_source(
        &self,
        items: &[FeedItem],
        cap: usize,
        now: DateTime<Utc>,
    ) -> Vec<SourceBrief> {
        let mut out = Vec::new();
        for (source, group) in group_by_source(items) {
            let group: Vec<FeedItem> = group.into_iter().take(cap).cloned().collect();
            let curated = self.curate(&group, now).await;
            out.push(SourceBrief { source, curated });
        }
        out
    }
}

/// Stable grouping: groups appear in the order their source is first seen.
pub fn group_by_source(items: &[FeedItem]) -> Vec<(String, Vec<&FeedItem>)> {
    let mut groups: Vec<(String, Vec<&FeedItem>)> = Vec::new();
    for it in items {
        let key = if it.source.is_empty() {
            "Unknown"
        } else {
            it.source.as_str()
        };
        match groups.iter_mut().find(|(k, _)| k == key) {
            Some((_, g)) => g.push(it),
            None => groups.push((key.to_string(), vec![it])),
        }
    }
    groups
}
