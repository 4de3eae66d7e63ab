// src/curate/ai.rs
//! Generator-backed curation with heuristic fallback.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde_json::Value;

use crate::curate::brief::CuratedBrief;
use crate::curate::generator::{generate_json, DynGenerator};
use crate::curate::heuristic::HeuristicStrategy;
use crate::curate::CurationStrategy;
use crate::gate::Cooldown;
use crate::ingest::types::FeedItem;

const PROMPT_ITEMS: usize = 10;
const TITLE_CHARS: usize = 200;
const SUMMARY_CHARS: usize = 300;

pub const SYSTEM_INSTRUCTION: &str = "You are a precise journalist. Return ONLY valid JSON matching the provided schema exactly. No additional text or explanations.";

const SCHEMA: &str = r#"{
  "brief": "string",
  "bullets": ["string", "string"],
  "regions": { "cities": ["string"], "countries": ["string"] },
  "verdict": "neutral",
  "sentiment": "neutral",
  "trending_topics": ["string"],
  "impact_level": "medium",
  "credibility_score": 7,
  "links": [{ "title": "string", "url": "string", "source": "string", "reliability": 7 }]
}"#;

pub struct AiStrategy {
    generator: DynGenerator,
    cooldown: Arc<Cooldown>,
    fallback: HeuristicStrategy,
}

impl AiStrategy {
    /// `fallback` should be the loose heuristic.
    pub fn new(generator: DynGenerator, cooldown: Arc<Cooldown>, fallback: HeuristicStrategy) -> Self {
        Self {
            generator,
            cooldown,
            fallback,
        }
    }

    pub fn generator_name(&self) -> &'static str {
        self.generator.name()
    }
}

/// User prompt: instructions, schema, and up to ten clipped items.
pub fn build_prompt(items: &[FeedItem]) -> String {
    let input = items
        .iter()
        .take(PROMPT_ITEMS)
        .map(|i| {
            let title: String = i.title.chars().take(TITLE_CHARS).collect();
            let summary: String = i.summary.chars().take(SUMMARY_CHARS).collect();
            format!(
                "- {}\n{}\nSource: {}",
                if title.is_empty() { "No title".into() } else { title },
                if summary.is_empty() { "No summary".into() } else { summary },
                if i.source.is_empty() { "Unknown" } else { i.source.as_str() },
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "From these news items, produce a comprehensive objective brief with sentiment analysis and credibility scoring.\n\
Extract cities/countries if mentioned, pick 6-8 bullet points, assign verdict and sentiment.\n\
Rate credibility 1-10 based on source reliability. Include trending topics and impact assessment.\n\n\
IMPORTANT: Return ONLY valid JSON matching this exact schema:\n{SCHEMA}\n\nINPUT:\n{input}"
    )
}

/// Minimal shape check: an object with a non-empty string `brief` and an
/// array `bullets`, and no fallback/error sentinel.
pub fn validate(v: Value) -> Option<CuratedBrief> {
    let obj = v.as_object()?;
    if obj.get("fallback").and_then(Value::as_bool).unwrap_or(false) || obj.contains_key("error") {
        return None;
    }
    let brief_ok = obj
        .get("brief")
        .and_then(Value::as_str)
        .is_some_and(|b| !b.trim().is_empty());
    let bullets_ok = obj.get("bullets").is_some_and(Value::is_array);
    if !(brief_ok && bullets_ok) {
        return None;
    }
    serde_json::from_value::<CuratedBrief>(v)
        .ok()
        .map(CuratedBrief::normalize)
}

#[async_trait]
impl CurationStrategy for AiStrategy {
    async fn curate(&self, items: &[FeedItem], now: DateTime<Utc>) -> CuratedBrief {
        let provider = self.generator.name();
        counter!("news_ai_calls_total", "provider" => provider).increment(1);
        let t0 = Instant::now();
        let res = generate_json(&*self.generator, SYSTEM_INSTRUCTION, &build_prompt(items)).await;
        histogram!("news_ai_latency_ms").record(t0.elapsed().as_secs_f64() * 1000.0);

        match res {
            Ok(v) => match validate(v) {
                Some(brief) => brief,
                None => {
                    tracing::warn!(provider, "generator output failed validation, using heuristic");
                    counter!("news_ai_fallbacks_total", "reason" => "invalid").increment(1);
                    self.fallback.build(items)
                }
            },
            Err(e) => {
                if e.starts_cooldown() {
                    self.cooldown.start(now);
                }
                tracing::warn!(provider, error = %e, "generator failed, using heuristic");
                counter!("news_ai_fallbacks_total", "reason" => "error").increment(1);
                self.fallback.build(items)
            }
        }
    }

    fn name(&self) -> &'static str {
        "ai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curate::generator::{MockGenerator, MockReply};
    use crate::curate::reliability::ReliabilityTable;
    use crate::store::{KvStore, MemoryStore};
    use chrono::TimeZone;
    use serde_json::json;

    fn items() -> Vec<FeedItem> {
        vec![
            FeedItem::new("Storm nears Lisbon", "https://x/1", "BBC World"),
            FeedItem::new("Chip exports resume", "https://x/2", "Wired"),
        ]
    }

    fn strategy(gen: Arc<MockGenerator>) -> (AiStrategy, Arc<Cooldown>) {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let cooldown = Arc::new(Cooldown::from_minutes(store, 10));
        let loose = HeuristicStrategy::loose(Arc::new(ReliabilityTable::default_seed()));
        (AiStrategy::new(gen, cooldown.clone(), loose), cooldown)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn prompt_embeds_at_most_ten_clipped_items() {
        let mut many: Vec<FeedItem> = (0..12)
            .map(|i| FeedItem::new(&format!("Title {i}"), "", "S"))
            .collect();
        many[0].title = "T".repeat(500);
        many[0].summary = "s".repeat(500);
        let p = build_prompt(&many);
        assert!(p.contains("Title 9"));
        assert!(!p.contains("Title 10"));
        assert!(p.contains(&"T".repeat(200)));
        assert!(!p.contains(&"T".repeat(201)));
        assert!(!p.contains(&"s".repeat(301)));
        assert!(p.contains("\"trending_topics\""));
    }

    #[test]
    fn validation_rejects_sentinels_and_bad_shapes() {
        assert!(validate(json!({"fallback": true, "brief": "x", "bullets": []})).is_none());
        assert!(validate(json!({"error": "nope"})).is_none());
        assert!(validate(json!({"brief": "", "bullets": []})).is_none());
        assert!(validate(json!({"brief": "x", "bullets": "a"})).is_none());
        assert!(validate(json!(["brief"])).is_none());
        let b = validate(json!({"brief": "x", "bullets": ["a"], "links": null})).unwrap();
        assert!(b.links.is_empty());
    }

    #[tokio::test]
    async fn valid_output_is_used() {
        let gen = Arc::new(MockGenerator::always(MockReply::Text(
            r#"{"brief":"Storms and chips","bullets":["a","b"],"sentiment":"negative","impact_level":"high","credibility_score":8}"#.into(),
        )));
        let (s, cd) = strategy(gen.clone());
        let b = s.curate(&items(), t0()).await;
        assert_eq!(b.brief, "Storms and chips");
        assert!(b.is_breaking());
        assert!(!cd.is_active(t0()));
        assert_eq!(gen.calls(), 1);
    }

    #[tokio::test]
    async fn quota_starts_cooldown_and_falls_back() {
        let gen = Arc::new(MockGenerator::always(MockReply::Fail {
            status: None,
            body: "429 RESOURCE_EXHAUSTED".into(),
        }));
        let (s, cd) = strategy(gen);
        let b = s.curate(&items(), t0()).await;
        assert_eq!(b.brief, "Breaking: Storm nears Lisbon");
        assert_eq!(b.verdict, "developing");
        assert!(cd.is_active(t0() + chrono::Duration::minutes(5)));
    }

    #[tokio::test]
    async fn malformed_output_falls_back_without_cooldown() {
        let gen = Arc::new(MockGenerator::always(MockReply::Text("not json at all".into())));
        let (s, cd) = strategy(gen);
        let b = s.curate(&items(), t0()).await;
        assert_eq!(b.verdict, "developing");
        assert!(!cd.is_active(t0()));
    }
}
