// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::env;

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_daily_limit() -> u32 {
    200
}
fn default_cooldown_minutes() -> u64 {
    10
}
fn default_timeout_secs() -> u64 {
    20
}

/// `[ai]` section: which structured generator to call and how hard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "gemini" | "openai" | "mock" | "disabled" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model override; each provider has its own default.
    #[serde(default)]
    pub model: Option<String>,
    /// OpenAI-compatible base URL, e.g. a local gateway.
    #[serde(default)]
    pub base_url: Option<String>,
    /// "ENV" means: read from GEMINI_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// Cooldown after a quota/transport failure.
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: None,
            base_url: None,
            api_key: default_api_key(),
            daily_limit: default_daily_limit(),
            cooldown_minutes: default_cooldown_minutes(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AiConfig {
    /// Normalize provider name and resolve an `"ENV"` api key.
    ///
    /// A missing env key is not an error: the generator simply reports itself
    /// unavailable and the curator falls back to the heuristic.
    pub fn resolve(mut self) -> Self {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            let var = match self.provider.as_str() {
                "gemini" => "GEMINI_API_KEY",
                "openai" => "OPENAI_API_KEY",
                _ => "",
            };
            self.api_key = if var.is_empty() {
                String::new()
            } else {
                env::var(var).unwrap_or_default()
            };
        }

        if self.cooldown_minutes == 0 {
            self.cooldown_minutes = default_cooldown_minutes();
        }
        self
    }

    /// Short sha256 prefix of the api key, safe to log. Empty key → "none".
    pub fn key_fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        if self.api_key.is_empty() {
            return "none".to_string();
        }
        let digest = Sha256::digest(self.api_key.as_bytes());
        let mut out = String::with_capacity(12);
        for b in digest.iter().take(6) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}
