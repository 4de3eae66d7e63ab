// src/ingest/types.rs
use chrono::{DateTime, Utc};

use crate::error::NewsError;

/// One normalized feed entry. Produced per refresh cycle, never persisted.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub summary: String,
    pub source: String, // e.g. "BBC World"
}

impl FeedItem {
    /// Convenience for tests and fixtures.
    pub fn new(title: &str, link: &str, source: &str) -> Self {
        Self {
            title: title.to_string(),
            link: link.to_string(),
            published_at: None,
            summary: String::new(),
            source: source.to_string(),
        }
    }
}

/// A named feed endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSource {
    pub name: &'static str,
    pub url: &'static str,
}

/// Retrieves the raw body of a feed document.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, NewsError>;
    fn name(&self) -> &'static str;
}
