// src/cache.rs
//! The persisted latest brief.
//!
//! One payload under `cf_latest_brief`, replaced wholesale on every
//! successful refresh.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::curate::{CuratedBrief, SourceBrief};
use crate::error::NewsError;
use crate::store::{KvStore, LATEST_BRIEF_KEY};

/// `YYYY-MM-DD HH:MM`, UTC.
pub const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn format_stamp(now: DateTime<Utc>) -> String {
    now.format(STAMP_FORMAT).to_string()
}

pub fn parse_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(stamp.trim(), STAMP_FORMAT)
        .ok()
        .map(|n| n.and_utc())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPayload {
    pub curated: CuratedBrief,
    #[serde(default)]
    pub by_source: Vec<SourceBrief>,
    pub stamp: String,
}

impl CachedPayload {
    pub fn new(curated: CuratedBrief, by_source: Vec<SourceBrief>, now: DateTime<Utc>) -> Self {
        Self {
            curated,
            by_source,
            stamp: format_stamp(now),
        }
    }

    pub fn stamped_at(&self) -> Option<DateTime<Utc>> {
        parse_stamp(&self.stamp)
    }
}

pub struct BriefCache {
    store: Arc<dyn KvStore>,
}

impl BriefCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// `None` when nothing is cached or the entry does not deserialize.
    pub fn load(&self) -> Option<CachedPayload> {
        let raw = self.store.get(LATEST_BRIEF_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %e, "cached brief unreadable");
                None
            }
        }
    }

    pub fn load_required(&self) -> Result<CachedPayload, NewsError> {
        self.load()
            .ok_or_else(|| NewsError::InsufficientCacheData("no cached brief".into()))
    }

    pub fn save(&self, payload: &CachedPayload) -> Result<(), NewsError> {
        let json = serde_json::to_string(payload)?;
        self.store.set(LATEST_BRIEF_KEY, &json)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), NewsError> {
        self.store.remove(LATEST_BRIEF_KEY)?;
        Ok(())
    }
}
