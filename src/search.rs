// src/search.rs
//! Query/sentiment/region filtering over the cached payload. Never fetches.

use crate::cache::CachedPayload;
use crate::curate::{CuratedBrief, SourceBrief};

pub const ALL_SOURCES: &str = "All Sources";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Matches(Vec<SourceBrief>),
    /// Nothing matched the filters.
    Empty,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, SearchOutcome::Empty)
    }

    pub fn entries(&self) -> &[SourceBrief] {
        match self {
            SearchOutcome::Matches(v) => v,
            SearchOutcome::Empty => &[],
        }
    }
}

/// Lowercased, trimmed filter; "" and "all" mean no filter.
fn filter_term(raw: &str) -> Option<String> {
    let t = raw.trim().to_lowercase();
    if t.is_empty() || t == "all" {
        None
    } else {
        Some(t)
    }
}

fn matches_sentiment(cur: &CuratedBrief, sentiment: Option<&str>) -> bool {
    sentiment.map_or(true, |s| cur.sentiment.as_str() == s)
}

fn matches_region(cur: &CuratedBrief, region: Option<&str>) -> bool {
    region.map_or(true, |r| {
        cur.regions.iter().any(|name| name.to_lowercase().contains(r))
    })
}

fn haystack(cur: &CuratedBrief) -> String {
    std::iter::once(&cur.brief)
        .chain(cur.bullets.iter())
        .chain(cur.trending_topics.iter())
        .chain(cur.regions.iter())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn matches_query(cur: &CuratedBrief, query: Option<&str>) -> bool {
    query.map_or(true, |q| haystack(cur).contains(q))
}

/// Copy of `cur` whose bullets and links only keep query hits.
fn narrow_to_query(cur: &CuratedBrief, query: Option<&str>) -> CuratedBrief {
    let Some(q) = query else {
        return cur.clone();
    };
    let mut out = cur.clone();
    out.bullets.retain(|b| b.to_lowercase().contains(q));
    out.links.retain(|l| {
        let label = if l.title.is_empty() { &l.url } else { &l.title };
        label.to_lowercase().contains(q)
    });
    out
}

/// Per-source search. Entries are the payload's `by_source` list, or a single
/// "All Sources" entry wrapping the headline brief when that list is empty.
pub fn search(payload: &CachedPayload, query: &str, sentiment: &str, region: &str) -> SearchOutcome {
    let q = filter_term(query);
    let s = filter_term(sentiment);
    let r = filter_term(region);

    let fallback;
    let entries: &[SourceBrief] = if payload.by_source.is_empty() {
        fallback = [SourceBrief {
            source: ALL_SOURCES.to_string(),
            curated: payload.curated.clone(),
        }];
        &fallback
    } else {
        &payload.by_source
    };

    let hits: Vec<SourceBrief> = entries
        .iter()
        .filter(|e| {
            matches_sentiment(&e.curated, s.as_deref())
                && matches_region(&e.curated, r.as_deref())
                && matches_query(&e.curated, q.as_deref())
        })
        .map(|e| SourceBrief {
            source: e.source.clone(),
            curated: narrow_to_query(&e.curated, q.as_deref()),
        })
        .collect();

    if hits.is_empty() {
        SearchOutcome::Empty
    } else {
        SearchOutcome::Matches(hits)
    }
}

/// Same predicate over the headline brief only. Region filters treat `-` as a
/// space (`new-york` finds "New York"). `None` when the brief does not match.
pub fn filter_by_query(
    payload: &CachedPayload,
    query: &str,
    region: &str,
    sentiment: &str,
) -> Option<CuratedBrief> {
    let q = filter_term(query);
    let r = filter_term(&region.replace('-', " "));
    let s = filter_term(sentiment);
    let cur = &payload.curated;

    if matches_sentiment(cur, s.as_deref())
        && matches_region(cur, r.as_deref())
        && matches_query(cur, q.as_deref())
    {
        Some(narrow_to_query(cur, q.as_deref()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curate::{BriefLink, Regions, Sentiment};

    fn brief(text: &str, sentiment: Sentiment, city: &str) -> CuratedBrief {
        CuratedBrief {
            brief: text.to_string(),
            bullets: vec![format!("{text} first"), "unrelated line".to_string()],
            regions: Regions {
                cities: vec![city.to_string()],
                countries: vec![],
            },
            sentiment,
            links: vec![
                BriefLink {
                    title: format!("{text} link"),
                    url: "https://a".into(),
                    source: "S".into(),
                    reliability: 7,
                },
                BriefLink {
                    title: String::new(),
                    url: "https://unrelated.example".into(),
                    source: "S".into(),
                    reliability: 7,
                },
            ],
            ..CuratedBrief::default()
        }
    }

    fn payload() -> CachedPayload {
        CachedPayload {
            curated: brief("Harbor strike", Sentiment::Negative, "New York"),
            by_source: vec![
                SourceBrief {
                    source: "Wired".into(),
                    curated: brief("Chip boom", Sentiment::Positive, "Austin"),
                },
                SourceBrief {
                    source: "BBC World".into(),
                    curated: brief("Harbor strike", Sentiment::Negative, "New York"),
                },
            ],
            stamp: "2024-01-01 00:00".into(),
        }
    }

    #[test]
    fn unfiltered_search_returns_every_entry() {
        let out = search(&payload(), "", "", "");
        assert_eq!(out.entries().len(), 2);
        assert_eq!(out.entries()[0].curated.bullets.len(), 2);
    }

    #[test]
    fn query_narrows_bullets_and_links() {
        let out = search(&payload(), "HARBOR", "", "");
        let e = out.entries();
        assert_eq!(e.len(), 1);
        assert_eq!(e[0].source, "BBC World");
        assert_eq!(e[0].curated.bullets, vec!["Harbor strike first"]);
        assert_eq!(e[0].curated.links.len(), 1);
    }

    #[test]
    fn untitled_links_match_on_url() {
        let out = search(&payload(), "unrelated", "", "");
        let e = out.entries();
        assert_eq!(e.len(), 2);
        assert_eq!(e[0].curated.links.len(), 1);
        assert_eq!(e[0].curated.links[0].url, "https://unrelated.example");
        // urls alone never make an entry match
        assert!(search(&payload(), "example", "", "").is_empty());
    }

    #[test]
    fn sentiment_and_region_filters() {
        assert_eq!(search(&payload(), "", "positive", "").entries()[0].source, "Wired");
        assert_eq!(search(&payload(), "", "", "york").entries()[0].source, "BBC World");
        assert!(search(&payload(), "", "negative", "austin").is_empty());
        assert_eq!(search(&payload(), "", "all", "").entries().len(), 2);
    }

    #[test]
    fn empty_by_source_searches_the_headline() {
        let mut p = payload();
        p.by_source.clear();
        let out = search(&p, "", "", "");
        assert_eq!(out.entries()[0].source, ALL_SOURCES);
    }

    #[test]
    fn filter_by_query_with_no_filters_is_identity() {
        let p = payload();
        assert_eq!(filter_by_query(&p, "", "", ""), Some(p.curated.clone()));
    }

    #[test]
    fn filter_by_query_region_dashes() {
        let p = payload();
        assert!(filter_by_query(&p, "", "new-york", "").is_some());
        assert!(filter_by_query(&p, "", "austin", "").is_none());
        assert!(filter_by_query(&p, "", "", "positive").is_none());
    }
}
