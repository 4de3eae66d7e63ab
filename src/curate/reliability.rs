// src/curate/reliability.rs
//! # Source reliability
//!
//! Maps feed source names to a 1–10 reliability score used for brief links
//! and the strict-mode credibility average.
//!
//! - Built-in seed for the shipped bundles.
//! - Optional JSON override file (`scores` + `aliases`), merged over the seed.
//! - Case/punctuation-insensitive lookup.
//! - Fallback order: exact → alias → longest substring → default (7).

use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

use crate::curate::brief::DEFAULT_RELIABILITY;

#[derive(Debug, Clone, Deserialize)]
pub struct ReliabilityTable {
    #[serde(default = "default_score")]
    pub default_score: u8,
    #[serde(default)]
    pub scores: HashMap<String, u8>,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

fn default_score() -> u8 {
    DEFAULT_RELIABILITY
}

impl Default for ReliabilityTable {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl ReliabilityTable {
    /// Seed plus overrides from `path`. A missing or unreadable file yields
    /// the seed alone.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let mut table = Self::default_seed();
        let path = path.as_ref();
        let overrides = match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str::<ReliabilityTable>(&s),
            Err(_) => return table,
        };
        match overrides {
            Ok(o) => {
                table.default_score = o.default_score.clamp(1, 10);
                for (k, v) in o.scores {
                    table.scores.insert(normalize(&k), v.clamp(1, 10));
                }
                for (a, c) in o.aliases {
                    table.aliases.insert(normalize(&a), normalize(&c));
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed reliability file");
            }
        }
        table
    }

    pub fn score_for(&self, source: &str) -> u8 {
        let s = normalize(source);
        if s.is_empty() {
            return self.default_score;
        }

        if let Some(&v) = self.scores.get(&s) {
            return v;
        }

        if let Some(canon) = self.aliases.get(&s) {
            if let Some(&v) = self.scores.get(canon) {
                return v;
            }
        }

        // Longest key wins so "the guardian tech" beats "guardian".
        self.scores
            .iter()
            .filter(|(k, _)| s.contains(k.as_str()))
            .max_by_key(|(k, _)| k.len())
            .map(|(_, &v)| v)
            .unwrap_or(self.default_score)
    }

    pub fn default_seed() -> Self {
        let mut scores = HashMap::new();
        let mut aliases = HashMap::new();

        for (k, v) in [
            ("reuters world", 9),
            ("ap top", 9),
            ("bbc world", 9),
            ("al jazeera", 7),
            ("techcrunch", 8),
            ("wired", 8),
            ("the guardian tech", 8),
            ("npr technology", 8),
        ] {
            scores.insert(k.to_string(), v);
        }

        for (a, c) in [
            ("reuters", "reuters world"),
            ("associated press", "ap top"),
            ("ap news", "ap top"),
            ("bbc", "bbc world"),
            ("bbc news", "bbc world"),
            ("aljazeera", "al jazeera"),
            ("npr", "npr technology"),
            ("guardian technology", "the guardian tech"),
        ] {
            aliases.insert(a.to_string(), c.to_string());
        }

        Self {
            default_score: DEFAULT_RELIABILITY,
            scores,
            aliases,
        }
    }
}

/// Lowercase, separators and punctuation to spaces, collapse runs.
fn normalize(s: &str) -> String {
    let mut out = s.trim().to_ascii_lowercase();
    for ch in ['—', '–', '-', '_', '/', '\\'] {
        out = out.replace(ch, " ");
    }
    out = out.replace(['\n', '\r', '\t', '.', ',', '’', '\''], " ");
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn seed() -> ReliabilityTable {
        ReliabilityTable::default_seed()
    }

    #[test]
    fn shipped_sources_have_static_scores() {
        let t = seed();
        assert_eq!(t.score_for("Reuters World"), 9);
        assert_eq!(t.score_for("BBC World"), 9);
        assert_eq!(t.score_for("Al Jazeera"), 7);
        assert_eq!(t.score_for("The Guardian Tech"), 8);
    }

    #[test]
    fn lookup_is_case_and_punctuation_insensitive() {
        let t = seed();
        assert_eq!(t.score_for("REUTERS-WORLD"), 9);
        assert_eq!(t.score_for("  npr   technology "), 8);
    }

    #[test]
    fn aliases_and_substrings() {
        let t = seed();
        assert_eq!(t.score_for("Associated Press"), 9);
        assert_eq!(t.score_for("Wired Magazine"), 8);
    }

    #[test]
    fn unknown_source_defaults_to_seven() {
        let t = seed();
        assert_eq!(t.score_for("Hacker News"), 7);
        assert_eq!(t.score_for(""), 7);
    }

    #[test]
    fn file_overrides_merge_over_seed() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"default_score": 5, "scores": {{"Hacker News": 6, "Wired": 10}}}}"#
        )
        .unwrap();
        let t = ReliabilityTable::load_from_file(f.path());
        assert_eq!(t.score_for("Hacker News"), 6);
        assert_eq!(t.score_for("Wired"), 10);
        assert_eq!(t.score_for("BBC World"), 9);
        assert_eq!(t.score_for("Nobody"), 5);
    }

    #[test]
    fn missing_file_is_the_seed() {
        let t = ReliabilityTable::load_from_file("/definitely/not/here.json");
        assert_eq!(t.score_for("AP Top"), 9);
    }

    #[test]
    fn shipped_override_file_keeps_the_seed_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/source_reliability.json");
        assert!(path.exists());
        let t = ReliabilityTable::load_from_file(&path);
        for src in [
            "Hacker News",
            "Reddit WorldNews",
            "The Guardian World",
            "NYTimes World",
            "NYTimes Technology",
            "Somewhere Else",
        ] {
            assert_eq!(t.score_for(src), 7, "{src}");
        }
        assert_eq!(t.score_for("BBC World"), 9);
        assert_eq!(t.score_for("Al Jazeera"), 7);
    }
}
