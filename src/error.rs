//! Error taxonomy for the news pipeline.
//!
//! Most of these never reach an end user: per-feed and per-generation errors
//! are absorbed where they happen and turned into omitted items or a heuristic
//! brief. Only `AllSourcesFailed` and `InsufficientCacheData` travel up to the
//! refresh caller / health watcher.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NewsError {
    /// Every relay failed for one feed target.
    #[error("all {attempts} relays failed for {target}")]
    FetchExhausted { target: String, attempts: usize },

    /// No source (primary or backup) produced a single item this cycle.
    #[error("no feed source produced any items")]
    AllSourcesFailed,

    /// Generator answered with a rate-limit / quota signal.
    #[error("generator quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Generator transport failed or is not configured.
    #[error("generator unavailable: {0}")]
    GenerationUnavailable(String),

    /// Generator answered, but nothing usable could be extracted.
    #[error("malformed generator output: {0}")]
    MalformedGenerationOutput(String),

    /// No cached payload, or the cached payload cannot be used.
    #[error("insufficient cache data: {0}")]
    InsufficientCacheData(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl NewsError {
    /// Classify a failed generator call from its HTTP status (if any) and body.
    ///
    /// 429 or a body mentioning `RESOURCE_EXHAUSTED` / `quota` is a quota signal;
    /// everything else is treated as plain unavailability.
    pub fn from_generation_failure(status: Option<u16>, body: &str) -> Self {
        let lower = body.to_ascii_lowercase();
        let quota = status == Some(429)
            || body.contains("429")
            || body.contains("RESOURCE_EXHAUSTED")
            || lower.contains("quota");
        let msg = match status {
            Some(s) => format!("{s}: {}", truncate(body, 200)),
            None => truncate(body, 200),
        };
        if quota {
            NewsError::QuotaExceeded(msg)
        } else {
            NewsError::GenerationUnavailable(msg)
        }
    }

    /// Whether this failure should put the generator on cooldown.
    pub fn starts_cooldown(&self) -> bool {
        matches!(
            self,
            NewsError::QuotaExceeded(_) | NewsError::GenerationUnavailable(_)
        )
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
