// src/render.rs
//! Server-side HTML fragments for the brief panel and the news lab.
//!
//! All interpolated text goes through `html_escape`; link targets that are
//! not http(s) are replaced by `#`.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::cache::CachedPayload;
use crate::curate::{CuratedBrief, ImpactLevel, Sentiment};
use crate::search::SearchOutcome;

pub const EMPTY_STATE: &str = "No results match your filters.";
pub const NO_BRIEF: &str = "No brief yet";

const MAX_CARD_LINKS: usize = 6;

fn sentiment_class(s: Sentiment) -> &'static str {
    match s {
        Sentiment::Positive => "sentiment-positive",
        Sentiment::Neutral => "sentiment-neutral",
        Sentiment::Negative => "sentiment-negative",
    }
}

fn impact_class(i: ImpactLevel) -> &'static str {
    match i {
        ImpactLevel::Low => "impact-low",
        ImpactLevel::Medium => "impact-medium",
        ImpactLevel::High => "impact-high",
    }
}

fn safe_href(url: &str) -> String {
    let lower = url.trim().to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        encode_double_quoted_attribute(url.trim()).into_owned()
    } else {
        "#".to_string()
    }
}

fn join_or_dash(v: &[String]) -> String {
    if v.is_empty() {
        "—".to_string()
    } else {
        encode_text(&v.join(", ")).into_owned()
    }
}

/// One brief card.
pub fn render_card(cur: &CuratedBrief) -> String {
    let heading: String = cur.brief.chars().take(100).collect();
    let ellipsis = if cur.brief.chars().count() > 100 { "…" } else { "" };

    let bullets: String = cur
        .bullets
        .iter()
        .map(|b| format!("<li>{}</li>", encode_text(b)))
        .collect();

    let trending = if cur.trending_topics.is_empty() {
        String::new()
    } else {
        let tags: String = cur
            .trending_topics
            .iter()
            .map(|t| format!(r#"<span class="topic-tag">{}</span>"#, encode_text(t)))
            .collect();
        format!(r#"<div class="trending-topics"><strong>Trending:</strong> {tags}</div>"#)
    };

    let links: String = cur
        .links
        .iter()
        .take(MAX_CARD_LINKS)
        .map(|l| {
            let label = if l.title.is_empty() { &l.url } else { &l.title };
            let source = if l.source.is_empty() { "Unknown" } else { l.source.as_str() };
            format!(
                r#"<a target="_blank" rel="noopener" href="{}" class="source-link">{}<span class="source-meta">{} • {}/10</span></a>"#,
                safe_href(&l.url),
                encode_text(label),
                encode_text(source),
                l.reliability
            )
        })
        .collect();

    let breaking = if cur.is_breaking() {
        r#"<span class="breaking">Breaking</span>"#
    } else {
        ""
    };

    format!(
        r#"<div class="brief-card"><div class="card-header"><h3>{heading}{ellipsis}</h3>{breaking}<div class="card-meta"><span class="sentiment-indicator {sc}">{sentiment}</span><span class="impact-level {ic}">{impact} impact</span><span class="credibility-score">{cred}/10</span></div></div><ul>{bullets}</ul><div class="regions-info"><div class="muted tiny">Cities: {cities}</div><div class="muted tiny">Countries: {countries}</div></div>{trending}<div class="hr"></div><div class="links-section">{links}</div></div>"#,
        heading = encode_text(&heading),
        sc = sentiment_class(cur.sentiment),
        sentiment = cur.sentiment.as_str(),
        ic = impact_class(cur.impact_level),
        impact = cur.impact_level.as_str(),
        cred = cur.credibility_score,
        cities = join_or_dash(&cur.regions.cities),
        countries = join_or_dash(&cur.regions.countries),
    )
}

/// Latest-brief panel: card plus "updated" stamp, or the placeholder.
pub fn render_latest(payload: Option<&CachedPayload>) -> String {
    match payload {
        Some(p) => format!(
            r#"<section id="latest-brief">{}<div class="muted tiny">Updated {}</div></section>"#,
            render_card(&p.curated),
            encode_text(&p.stamp)
        ),
        None => format!(r#"<section id="latest-brief"><div class="muted">{NO_BRIEF}</div></section>"#),
    }
}

pub fn render_empty_state() -> String {
    format!(r#"<div class="muted">{EMPTY_STATE}</div>"#)
}

/// Per-source cards with a source header each, or the empty state.
pub fn render_news_lab(outcome: &SearchOutcome) -> String {
    let body = match outcome {
        SearchOutcome::Empty => render_empty_state(),
        SearchOutcome::Matches(entries) => entries
            .iter()
            .map(|e| {
                format!(
                    r#"<h4 class="muted">{}</h4>{}"#,
                    encode_text(&e.source),
                    render_card(&e.curated)
                )
            })
            .collect(),
    };
    format!(r#"<section id="news-cards">{body}</section>"#)
}

/// Shown instead of stale or missing content once recovery failed.
pub fn render_recovery(reason: &str, strict_mode: bool) -> String {
    let toggle = if strict_mode { "Disable" } else { "Enable" };
    format!(
        r#"<div class="card recovery"><h3>News {}</h3><p class="muted">We couldn't load curated news right now. Choose an option:</p><div class="row"><form method="post" action="/api/refresh?force=true"><button class="btn small" type="submit">Retry now</button></form><form method="post" action="/api/provider?provider={}"><button class="btn small" type="submit">{toggle} RSS-only mode</button></form></div></div>"#,
        encode_text(reason),
        if strict_mode { "world_bundle" } else { "rss_only" },
    )
}

/// Minimal standalone page around a fragment.
pub fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{}</title></head><body>{body}</body></html>",
        encode_text(title)
    )
}
