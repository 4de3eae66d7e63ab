// src/settings.rs
//! Provider preference and strict-mode flags, read from the shared store.

use std::fmt;
use std::io;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::store::{KvStore, PROVIDER_KEY, STRICT_MODE_KEY};

/// Which feed bundle / curation behaviour the user picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderPreference {
    RssOnly,
    WorldBundle,
    TechBundle,
    GuardianApi,
    NytApi,
    RedditRss,
    HnRss,
    GeminiAi,
    WebsimFree,
    /// Anything the settings UI wrote that we don't know; kept verbatim.
    Other(String),
}

impl ProviderPreference {
    pub fn as_str(&self) -> &str {
        match self {
            Self::RssOnly => "rss_only",
            Self::WorldBundle => "world_bundle",
            Self::TechBundle => "tech_bundle",
            Self::GuardianApi => "guardian_api",
            Self::NytApi => "nyt_api",
            Self::RedditRss => "reddit_rss",
            Self::HnRss => "hn_rss",
            Self::GeminiAi => "gemini_ai",
            Self::WebsimFree => "websim_free",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl Default for ProviderPreference {
    fn default() -> Self {
        Self::RssOnly
    }
}

impl From<&str> for ProviderPreference {
    fn from(s: &str) -> Self {
        match s.trim() {
            "rss_only" => Self::RssOnly,
            "world_bundle" => Self::WorldBundle,
            "tech_bundle" => Self::TechBundle,
            "guardian_api" => Self::GuardianApi,
            "nyt_api" => Self::NytApi,
            "reddit_rss" => Self::RedditRss,
            "hn_rss" => Self::HnRss,
            "gemini_ai" => Self::GeminiAi,
            "websim_free" => Self::WebsimFree,
            "" => Self::RssOnly,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ProviderPreference {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<ProviderPreference> for String {
    fn from(p: ProviderPreference) -> Self {
        p.as_str().to_string()
    }
}

impl FromStr for ProviderPreference {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for ProviderPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored preference; `rss_only` when nothing was ever chosen.
pub fn provider(store: &dyn KvStore) -> ProviderPreference {
    store
        .get(PROVIDER_KEY)
        .map(ProviderPreference::from)
        .unwrap_or_default()
}

pub fn set_provider(store: &dyn KvStore, pref: &ProviderPreference) -> io::Result<()> {
    store.set(PROVIDER_KEY, pref.as_str())
}

/// Strict (RSS-only, no generator) mode.
///
/// Always on for `rss_only`; otherwise on unless explicitly stored as `"false"`.
pub fn strict_mode(store: &dyn KvStore) -> bool {
    if provider(store) == ProviderPreference::RssOnly {
        return true;
    }
    store.get(STRICT_MODE_KEY).as_deref() != Some("false")
}

pub fn set_strict_mode(store: &dyn KvStore, on: bool) -> io::Result<()> {
    store.set(STRICT_MODE_KEY, if on { "true" } else { "false" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn unknown_values_are_preserved() {
        let p = ProviderPreference::from("bing_news");
        assert_eq!(p, ProviderPreference::Other("bing_news".into()));
        assert_eq!(p.to_string(), "bing_news");
    }

    #[test]
    fn absent_preference_is_rss_only_and_strict() {
        let s = MemoryStore::new();
        assert_eq!(provider(&s), ProviderPreference::RssOnly);
        assert!(strict_mode(&s));
    }

    #[test]
    fn strict_mode_defaults_on_and_follows_flag() {
        let s = MemoryStore::new();
        set_provider(&s, &ProviderPreference::GeminiAi).unwrap();
        assert!(strict_mode(&s));
        set_strict_mode(&s, false).unwrap();
        assert!(!strict_mode(&s));

        // rss_only always wins over the stored flag
        set_provider(&s, &ProviderPreference::RssOnly).unwrap();
        assert!(strict_mode(&s));
    }

    #[test]
    fn serde_uses_plain_strings() {
        let v = serde_json::to_string(&ProviderPreference::TechBundle).unwrap();
        assert_eq!(v, "\"tech_bundle\"");
        let back: ProviderPreference = serde_json::from_str("\"hn_rss\"").unwrap();
        assert_eq!(back, ProviderPreference::HnRss);
    }
}
