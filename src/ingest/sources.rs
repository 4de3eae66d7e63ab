// src/ingest/sources.rs
//! Feed bundles and the provider → bundle mapping.

use crate::ingest::types::FeedSource;
use crate::settings::ProviderPreference;

const fn src(name: &'static str, url: &'static str) -> FeedSource {
    FeedSource { name, url }
}

pub const REUTERS_WORLD: FeedSource = src("Reuters World", "https://www.reuters.com/world/rss");
pub const AP_TOP: FeedSource = src("AP Top", "https://apnews.com/rss");
pub const BBC_WORLD: FeedSource = src("BBC World", "http://feeds.bbci.co.uk/news/world/rss.xml");
pub const AL_JAZEERA: FeedSource = src("Al Jazeera", "https://www.aljazeera.com/xml/rss/all.xml");
pub const TECHCRUNCH: FeedSource = src("TechCrunch", "https://techcrunch.com/feed/");
pub const WIRED: FeedSource = src("Wired", "https://www.wired.com/feed/");
pub const GUARDIAN_TECH: FeedSource =
    src("The Guardian Tech", "https://www.theguardian.com/technology/rss");
pub const NPR_TECH: FeedSource = src("NPR Technology", "https://feeds.npr.org/1019/rss.xml");
pub const HACKER_NEWS: FeedSource = src("Hacker News", "https://news.ycombinator.com/rss");
pub const REDDIT_WORLDNEWS: FeedSource =
    src("Reddit WorldNews", "https://www.reddit.com/r/worldnews/.rss");

/// Default bundle: wire services plus tech outlets.
pub const ENHANCED_SOURCES: &[FeedSource] = &[
    REUTERS_WORLD,
    AP_TOP,
    BBC_WORLD,
    AL_JAZEERA,
    TECHCRUNCH,
    WIRED,
    GUARDIAN_TECH,
    NPR_TECH,
];

pub const WORLD_SOURCES: &[FeedSource] = &[REUTERS_WORLD, AP_TOP, BBC_WORLD];

pub const TECH_SOURCES: &[FeedSource] = &[TECHCRUNCH, WIRED, HACKER_NEWS];

pub const GUARDIAN_SOURCES: &[FeedSource] = &[
    src("The Guardian World", "https://www.theguardian.com/world/rss"),
    src(
        "The Guardian Technology",
        "https://www.theguardian.com/uk/technology/rss",
    ),
];

pub const NYT_SOURCES: &[FeedSource] = &[
    src(
        "NYTimes World",
        "https://rss.nytimes.com/services/xml/rss/nyt/World.xml",
    ),
    src(
        "NYTimes Technology",
        "https://rss.nytimes.com/services/xml/rss/nyt/Technology.xml",
    ),
];

pub const REDDIT_SOURCES: &[FeedSource] = &[REDDIT_WORLDNEWS];

pub const HN_SOURCES: &[FeedSource] = &[HACKER_NEWS];

/// Polled when a whole cycle produced nothing from the selected bundle.
pub const BACKUP_SOURCES: &[FeedSource] = &[REDDIT_WORLDNEWS, HACKER_NEWS];

/// Bundle for the given preference; unknown / non-bundle preferences get
/// the enhanced default.
pub fn choose_sources(pref: &ProviderPreference) -> &'static [FeedSource] {
    match pref {
        ProviderPreference::WorldBundle => WORLD_SOURCES,
        ProviderPreference::TechBundle => TECH_SOURCES,
        ProviderPreference::GuardianApi => GUARDIAN_SOURCES,
        ProviderPreference::NytApi => NYT_SOURCES,
        ProviderPreference::RedditRss => REDDIT_SOURCES,
        ProviderPreference::HnRss => HN_SOURCES,
        ProviderPreference::RssOnly
        | ProviderPreference::GeminiAi
        | ProviderPreference::WebsimFree
        | ProviderPreference::Other(_) => ENHANCED_SOURCES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[FeedSource]) -> Vec<&'static str> {
        v.iter().map(|s| s.name).collect()
    }

    #[test]
    fn bundles_are_non_empty_and_stable() {
        for p in [
            "rss_only",
            "world_bundle",
            "tech_bundle",
            "guardian_api",
            "nyt_api",
            "reddit_rss",
            "hn_rss",
            "gemini_ai",
            "websim_free",
        ] {
            let pref = ProviderPreference::from(p);
            let a = choose_sources(&pref);
            let b = choose_sources(&pref);
            assert!(!a.is_empty(), "{p} maps to an empty bundle");
            assert_eq!(a, b);
        }
    }

    #[test]
    fn known_bundles_map_exactly() {
        assert_eq!(
            names(choose_sources(&ProviderPreference::WorldBundle)),
            vec!["Reuters World", "AP Top", "BBC World"]
        );
        assert_eq!(
            names(choose_sources(&ProviderPreference::TechBundle)),
            vec!["TechCrunch", "Wired", "Hacker News"]
        );
    }

    #[test]
    fn unknown_preference_falls_back_to_enhanced() {
        let pref = ProviderPreference::from("something_new");
        assert_eq!(choose_sources(&pref), ENHANCED_SOURCES);
        assert_eq!(ENHANCED_SOURCES.len(), 8);
    }
}
