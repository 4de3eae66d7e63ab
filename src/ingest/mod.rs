// src/ingest/mod.rs
pub mod feed;
pub mod relay;
pub mod sources;
pub mod types;

use crate::ingest::feed::parse_feed_capped;
use crate::ingest::sources::BACKUP_SOURCES;
use crate::ingest::types::{FeedFetcher, FeedItem, FeedSource};
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize feed text: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    // 5) Tag stripping leaves " ." / " ," behind
    static RE_PUNCT: OnceCell<Regex> = OnceCell::new();
    let re_punct = RE_PUNCT.get_or_init(|| Regex::new(r" ([.,;:!?])").unwrap());
    out = re_punct.replace_all(&out, "$1").trim().to_string();

    // 6) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Fetch and parse every source in declared order. A source that fails is
/// logged and skipped; the cycle continues with the rest.
pub async fn collect_items(
    fetcher: &dyn FeedFetcher,
    sources: &[FeedSource],
    per_feed_cap: usize,
) -> Vec<FeedItem> {
    let mut all = Vec::new();
    for src in sources {
        match fetcher.fetch(src.url).await {
            Ok(body) => {
                let mut items = parse_feed_capped(&body, src.name, per_feed_cap);
                tracing::debug!(source = src.name, items = items.len(), "feed parsed");
                all.append(&mut items);
            }
            Err(e) => {
                tracing::debug!(source = src.name, error = %e, fetcher = fetcher.name(), "feed error");
                counter!("news_feed_exhausted_total").increment(1);
            }
        }
    }
    all
}

/// `collect_items`, falling back to the backup bundle when the selected
/// bundle produced nothing at all.
pub async fn collect_with_backup(
    fetcher: &dyn FeedFetcher,
    sources: &[FeedSource],
    per_feed_cap: usize,
) -> Vec<FeedItem> {
    let all = collect_items(fetcher, sources, per_feed_cap).await;
    if !all.is_empty() {
        return all;
    }
    tracing::warn!(
        primary = sources.len(),
        "no items from selected bundle, trying backup feeds"
    );
    counter!("news_backup_used_total").increment(1);
    collect_items(fetcher, BACKUP_SOURCES, per_feed_cap).await
}
