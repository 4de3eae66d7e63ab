// src/curate/heuristic.rs
//! Deterministic local curation.
//!
//! `Strict` is the RSS-only mode: headlines are passed through verbatim with
//! reliability-weighted credibility. `Loose` is the degraded shape used while
//! the generator is cooling down or returned something unusable.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::curate::brief::{BriefLink, CuratedBrief, ImpactLevel, Regions, Sentiment, MAX_BULLETS, MAX_TRENDING};
use crate::curate::reliability::ReliabilityTable;
use crate::curate::CurationStrategy;
use crate::ingest::types::FeedItem;

const STRICT_WINDOW: usize = 10;
const LOOSE_BULLETS: usize = 6;
const LOOSE_LINKS: usize = 5;
const LOOSE_RELIABILITY: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeuristicMode {
    Strict,
    Loose,
}

pub struct HeuristicStrategy {
    mode: HeuristicMode,
    reliability: Arc<ReliabilityTable>,
}

impl HeuristicStrategy {
    pub fn new(mode: HeuristicMode, reliability: Arc<ReliabilityTable>) -> Self {
        Self { mode, reliability }
    }

    pub fn strict(reliability: Arc<ReliabilityTable>) -> Self {
        Self::new(HeuristicMode::Strict, reliability)
    }

    pub fn loose(reliability: Arc<ReliabilityTable>) -> Self {
        Self::new(HeuristicMode::Loose, reliability)
    }

    pub fn mode(&self) -> HeuristicMode {
        self.mode
    }

    /// Synchronous entry point; the async trait impl just forwards here.
    pub fn build(&self, items: &[FeedItem]) -> CuratedBrief {
        match self.mode {
            HeuristicMode::Strict => strict_brief(items, &self.reliability),
            HeuristicMode::Loose => loose_brief(items),
        }
    }
}

#[async_trait]
impl CurationStrategy for HeuristicStrategy {
    async fn curate(&self, items: &[FeedItem], _now: DateTime<Utc>) -> CuratedBrief {
        self.build(items)
    }

    fn name(&self) -> &'static str {
        match self.mode {
            HeuristicMode::Strict => "strict",
            HeuristicMode::Loose => "loose",
        }
    }
}

fn clip(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Headlines verbatim, neutral tone, credibility from the reliability table.
pub fn strict_brief(items: &[FeedItem], reliability: &ReliabilityTable) -> CuratedBrief {
    let window = &items[..items.len().min(STRICT_WINDOW)];

    let brief = window
        .first()
        .map(|i| clip(&i.title, 180))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Latest headlines".to_string());

    let bullets: Vec<String> = window
        .iter()
        .take(MAX_BULLETS)
        .map(|i| i.title.clone())
        .filter(|t| !t.is_empty())
        .collect();

    let links: Vec<BriefLink> = window
        .iter()
        .take(MAX_BULLETS)
        .filter(|i| !i.link.is_empty())
        .map(|i| {
            let title = if i.title.is_empty() {
                i.link.clone()
            } else {
                clip(&i.title, 140)
            };
            let source = if i.source.is_empty() {
                "Unknown".to_string()
            } else {
                i.source.clone()
            };
            BriefLink {
                reliability: reliability.score_for(&i.source),
                title,
                url: i.link.clone(),
                source,
            }
        })
        .collect();

    let credibility_score = if links.is_empty() {
        crate::curate::brief::DEFAULT_RELIABILITY
    } else {
        let sum: u32 = links.iter().map(|l| l.reliability as u32).sum();
        (sum as f64 / links.len() as f64).round() as u8
    };

    CuratedBrief {
        brief,
        trending_topics: trending_topics(&bullets),
        bullets,
        regions: Regions::global(),
        verdict: "neutral".to_string(),
        sentiment: Sentiment::Neutral,
        impact_level: ImpactLevel::Medium,
        credibility_score,
        links,
    }
    .normalize()
}

/// Alphabetic words of four or more letters from the lowercased bullets,
/// first-seen order, at most six.
pub fn trending_topics(bullets: &[String]) -> Vec<String> {
    static RE_WORD: OnceCell<Regex> = OnceCell::new();
    let re = RE_WORD.get_or_init(|| Regex::new(r"\b[a-z]{4,}\b").unwrap());

    let joined = bullets.join(" ").to_lowercase();
    let mut seen = HashSet::new();
    re.find_iter(&joined)
        .map(|m| m.as_str())
        .filter(|w| seen.insert(*w))
        .take(MAX_TRENDING)
        .map(str::to_string)
        .collect()
}

/// Degraded brief while the generator is unavailable.
pub fn loose_brief(items: &[FeedItem]) -> CuratedBrief {
    let brief = match items.first() {
        None => "No news available at this time".to_string(),
        Some(i) if i.title.is_empty() => "Breaking: News update".to_string(),
        Some(i) => format!("Breaking: {}", clip(&i.title, 100)),
    };

    let bullets = items
        .iter()
        .take(LOOSE_BULLETS)
        .map(|i| {
            if i.title.is_empty() {
                "News item".to_string()
            } else {
                clip(&i.title, 120)
            }
        })
        .collect();

    let links = items
        .iter()
        .take(LOOSE_LINKS)
        .filter(|i| !i.link.is_empty())
        .map(|i| BriefLink {
            title: if i.title.is_empty() {
                "News Link".to_string()
            } else {
                clip(&i.title, 100)
            },
            url: i.link.clone(),
            source: if i.source.is_empty() {
                "Unknown".to_string()
            } else {
                i.source.clone()
            },
            reliability: LOOSE_RELIABILITY,
        })
        .collect();

    CuratedBrief {
        brief,
        bullets,
        regions: Regions::global(),
        verdict: "developing".to_string(),
        sentiment: Sentiment::Neutral,
        trending_topics: vec!["Breaking News".to_string(), "Global Updates".to_string()],
        impact_level: ImpactLevel::Medium,
        credibility_score: LOOSE_RELIABILITY,
        links,
    }
    .normalize()
}
