// src/config/mod.rs
//! Service configuration loaded from `config/news.toml`.
//!
//! Every field has a default, so an absent file (or an empty one) yields a
//! working configuration.

pub mod ai;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use ai::AiConfig;

pub const ENV_CONFIG_PATH: &str = "NEWS_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/news.toml";

/// Relay templates; `{encoded}` is replaced by the percent-encoded target,
/// `{url}` by the raw target.
pub const DEFAULT_RELAYS: &[&str] = &[
    "https://api.allorigins.win/raw?url={encoded}",
    "https://feed2json.org/convert?url={encoded}",
    "https://cors.isomorphic-git.org/{url}",
    "https://thingproxy.freeboard.io/fetch/{url}",
    "https://api.codetabs.com/v1/proxy?quest={url}",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_relays")]
    pub templates: Vec<String>,
    #[serde(default = "default_relay_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_relays() -> Vec<String> {
    DEFAULT_RELAYS.iter().map(|s| s.to_string()).collect()
}
fn default_relay_timeout_ms() -> u64 {
    10_000
}
fn default_user_agent() -> String {
    "civic-news-curator/0.1".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            templates: default_relays(),
            timeout_ms: default_relay_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl RelayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_items_per_feed")]
    pub max_items_per_feed: usize,
    #[serde(default = "default_max_items_curate")]
    pub max_items_curate: usize,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_max_items_per_feed() -> usize {
    12
}
fn default_max_items_curate() -> usize {
    32
}
fn default_refresh_interval_secs() -> u64 {
    3600
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_items_per_feed: default_max_items_per_feed(),
            max_items_curate: default_max_items_curate(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl PipelineConfig {
    /// Item cap for each per-source brief.
    pub fn per_source_cap(&self) -> usize {
        (self.max_items_curate / 2).max(8)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_health_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: i64,
}

fn default_health_interval_secs() -> u64 {
    10
}
fn default_stale_after_minutes() -> i64 {
    65
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_health_interval_secs(),
            stale_after_minutes: default_stale_after_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding settings, cooldown and the cached brief.
    /// Empty string keeps everything in memory.
    #[serde(default = "default_store_path")]
    pub store_path: String,
    /// Optional JSON override for per-source reliability scores.
    #[serde(default = "default_reliability_path")]
    pub reliability_path: String,
}

fn default_store_path() -> String {
    "state/news_store.json".to_string()
}
fn default_reliability_path() -> String {
    "config/source_reliability.json".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            reliability_path: default_reliability_path(),
        }
    }
}

impl NewsConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading news config from {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut cfg: NewsConfig = toml::from_str(content)?;
        cfg.ai = cfg.ai.resolve();
        if cfg.relay.templates.is_empty() {
            cfg.relay.templates = default_relays();
        }
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $NEWS_CONFIG_PATH
    /// 2) config/news.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        let mut cfg = Self::default();
        cfg.ai = cfg.ai.resolve();
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = NewsConfig::parse("").unwrap();
        assert_eq!(cfg.relay.templates.len(), DEFAULT_RELAYS.len());
        assert_eq!(cfg.relay.timeout_ms, 10_000);
        assert_eq!(cfg.pipeline.max_items_per_feed, 12);
        assert_eq!(cfg.pipeline.max_items_curate, 32);
        assert_eq!(cfg.pipeline.per_source_cap(), 16);
        assert_eq!(cfg.health.stale_after_minutes, 65);
        assert!(!cfg.ai.enabled);
        assert_eq!(cfg.ai.cooldown_minutes, 10);
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = NewsConfig::parse(
            r#"
[relay]
templates = ["{url}"]
timeout_ms = 2500

[pipeline]
max_items_curate = 10

[ai]
enabled = true
provider = "mock"
api_key = "inline"
"#,
        )
        .unwrap();
        assert_eq!(cfg.relay.templates, vec!["{url}".to_string()]);
        assert_eq!(cfg.relay.timeout(), Duration::from_millis(2500));
        assert_eq!(cfg.pipeline.per_source_cap(), 8);
        assert!(cfg.ai.enabled);
        assert_eq!(cfg.ai.api_key, "inline");
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);

        let v = NewsConfig::load_default().unwrap();
        assert_eq!(v.pipeline.max_items_per_feed, 12);

        let p = tmp.path().join("custom.toml");
        fs::write(&p, "[pipeline]\nmax_items_per_feed = 3\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        let v2 = NewsConfig::load_default().unwrap();
        assert_eq!(v2.pipeline.max_items_per_feed, 3);

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(NewsConfig::load_default().is_err());

        env::remove_var(ENV_CONFIG_PATH);
        env::set_current_dir(&old).unwrap();
    }
}
