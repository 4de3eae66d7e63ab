// tests/curation_scenarios.rs
//
// Curation policy end to end through the public `Curator`:
// - strict mode: verbatim headlines, reliability-weighted credibility
// - generator quota error: cooldown skips the generator for the window
// - JSON Feed parsing
// - filter_by_query with empty filters is the identity view

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use civic_news_curator::cache::CachedPayload;
use civic_news_curator::curate::generator::{DynGenerator, MockGenerator, MockReply};
use civic_news_curator::curate::reliability::ReliabilityTable;
use civic_news_curator::curate::{Curator, Sentiment};
use civic_news_curator::gate::Cooldown;
use civic_news_curator::ingest::feed::parse_feed;
use civic_news_curator::ingest::types::FeedItem;
use civic_news_curator::search::filter_by_query;
use civic_news_curator::settings::{self, ProviderPreference};
use civic_news_curator::store::{KvStore, MemoryStore};

const VALID_BRIEF: &str = r#"{
  "brief": "Election results settle",
  "bullets": ["Alpha wins election", "Markets rally"],
  "regions": {"cities": ["Paris"], "countries": ["France"]},
  "verdict": "calm",
  "sentiment": "positive",
  "trending_topics": ["election"],
  "impact_level": "high",
  "credibility_score": 8,
  "links": []
}"#;

fn batch() -> Vec<FeedItem> {
    vec![
        FeedItem::new("Alpha wins election", "https://bbc.example/1", "BBC World"),
        FeedItem::new("Markets rally", "https://reuters.example/2", "Reuters World"),
    ]
}

fn curator_with(
    generator: DynGenerator,
    strict: bool,
) -> (Curator, Arc<dyn KvStore>, Arc<Cooldown>) {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    // rss_only forces strict mode; pick a bundle so the flag decides
    settings::set_provider(store.as_ref(), &ProviderPreference::WorldBundle).unwrap();
    settings::set_strict_mode(store.as_ref(), strict).unwrap();
    let cooldown = Arc::new(Cooldown::from_minutes(store.clone(), 10));
    let curator = Curator::new(
        store.clone(),
        cooldown.clone(),
        generator,
        Arc::new(ReliabilityTable::default_seed()),
    );
    (curator, store, cooldown)
}

#[tokio::test]
async fn strict_mode_passes_headlines_through() {
    let mock = Arc::new(MockGenerator::always(MockReply::Text(VALID_BRIEF.into())));
    let (curator, _store, _cd) = curator_with(mock.clone(), true);

    let cur = curator.curate(&batch(), Utc::now()).await;

    assert!(cur.brief.starts_with("Alpha wins election"));
    assert_eq!(cur.bullets, vec!["Alpha wins election", "Markets rally"]);
    assert_eq!(cur.links.len(), 2);
    assert_eq!(cur.credibility_score, 9);
    assert_eq!(cur.sentiment, Sentiment::Neutral);
    assert_eq!(mock.calls(), 0, "strict mode must never consult the generator");
}

#[tokio::test]
async fn quota_error_puts_generator_on_cooldown() {
    let mock = Arc::new(MockGenerator::scripted(
        vec![MockReply::Fail {
            status: None,
            body: "429 RESOURCE_EXHAUSTED".into(),
        }],
        MockReply::Text(VALID_BRIEF.into()),
    ));
    let (curator, _store, cooldown) = curator_with(mock.clone(), false);
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

    let first = curator.curate(&batch(), t0).await;
    assert_eq!(mock.calls(), 1);
    assert_eq!(first.brief, "Breaking: Alpha wins election");
    assert_eq!(first.verdict, "developing");
    assert!(cooldown.is_active(t0));

    for minutes in [1, 5, 9] {
        let cur = curator.curate(&batch(), t0 + Duration::minutes(minutes)).await;
        assert_eq!(cur.verdict, "developing");
        assert_eq!(cur.credibility_score, 6);
    }
    assert_eq!(mock.calls(), 1, "no generator calls inside the cooldown window");

    let after = curator.curate(&batch(), t0 + Duration::minutes(11)).await;
    assert_eq!(mock.calls(), 2);
    assert_eq!(after.brief, "Election results settle");
    assert_eq!(after.sentiment, Sentiment::Positive);
    assert!(after.is_breaking());
}

#[tokio::test]
async fn malformed_output_falls_back_without_cooldown() {
    let mock = Arc::new(MockGenerator::always(MockReply::Text(
        "I'm sorry, I can't summarize that.".into(),
    )));
    let (curator, _store, cooldown) = curator_with(mock.clone(), false);
    let now = Utc::now();

    let cur = curator.curate(&batch(), now).await;
    assert_eq!(cur.verdict, "developing");
    assert!(!cooldown.is_active(now));

    curator.curate(&batch(), now).await;
    assert_eq!(mock.calls(), 2);
}

#[tokio::test]
async fn per_source_briefs_follow_first_seen_order() {
    let mock = Arc::new(MockGenerator::always(MockReply::Text(VALID_BRIEF.into())));
    let (curator, _store, _cd) = curator_with(mock, true);
    let mut items = batch();
    items.push(FeedItem::new("Second BBC story", "https://bbc.example/3", "BBC World"));

    let by_source = curator.curate_by_source(&items, 16, Utc::now()).await;
    let names: Vec<&str> = by_source.iter().map(|s| s.source.as_str()).collect();
    assert_eq!(names, vec!["BBC World", "Reuters World"]);
    assert_eq!(by_source[0].curated.bullets.len(), 2);
    assert_eq!(by_source[1].curated.bullets, vec!["Markets rally"]);
}

#[test]
fn json_feed_document_is_parsed() {
    let items = parse_feed(
        r#"{"items":[{"title":"X","url":"http://a","date_published":"2024-01-01"}]}"#,
        "Relay",
    );
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "X");
    assert_eq!(items[0].link, "http://a");
    assert_eq!(items[0].source, "Relay");
    assert_eq!(
        items[0].published_at,
        Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn empty_filters_are_the_identity_view() {
    let mock = Arc::new(MockGenerator::always(MockReply::Text(VALID_BRIEF.into())));
    let (curator, _store, _cd) = curator_with(mock, false);
    let now = Utc::now();
    let curated = curator.curate(&batch(), now).await;
    let payload = CachedPayload::new(curated.clone(), vec![], now);

    assert_eq!(filter_by_query(&payload, "", "", ""), Some(curated.clone()));
    assert_eq!(filter_by_query(&payload, "  ", "all", "ALL"), Some(curated));
}
