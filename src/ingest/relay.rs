// src/ingest/relay.rs
//! Relay (CORS proxy) fetcher.
//!
//! A target URL is wrapped by each relay template in turn; the first attempt
//! that answers 2xx with a non-empty body wins. Individual failures are only
//! logged at debug level.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::config::RelayConfig;
use crate::error::NewsError;
use crate::ingest::types::FeedFetcher;

/// Relay URL template with `{url}` / `{encoded}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTemplate(String);

impl RelayTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn wrap(&self, target: &str) -> String {
        let t = &self.0;
        if t.contains("{encoded}") {
            t.replace("{encoded}", &urlencoding::encode(target))
        } else if t.contains("{url}") {
            t.replace("{url}", target)
        } else {
            format!("{t}{target}")
        }
    }
}

/// Prepend `https://` when the target carries no http(s) scheme.
pub fn ensure_scheme(url: &str) -> String {
    static RE_SCHEME: OnceCell<Regex> = OnceCell::new();
    let re = RE_SCHEME.get_or_init(|| Regex::new(r"(?i)^https?://").unwrap());
    let url = url.trim();
    if re.is_match(url) {
        url.to_string()
    } else {
        format!("https://{}", url.trim_start_matches('/'))
    }
}

/// Try `candidates` in order, bounding each attempt by `per_attempt`.
///
/// Returns the first `Ok`, or the number of failed attempts.
pub async fn first_success<C, F, Fut, T, E>(
    candidates: impl IntoIterator<Item = C>,
    per_attempt: Duration,
    mut attempt: F,
) -> std::result::Result<T, usize>
where
    C: Display,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let mut failed = 0usize;
    for candidate in candidates {
        let label = candidate.to_string();
        match tokio::time::timeout(per_attempt, attempt(candidate)).await {
            Ok(Ok(v)) => return Ok(v),
            Ok(Err(e)) => {
                tracing::debug!(candidate = %label, error = %e, "attempt failed");
            }
            Err(_) => {
                tracing::debug!(candidate = %label, timeout_ms = per_attempt.as_millis() as u64, "attempt timed out");
            }
        }
        failed += 1;
    }
    Err(failed)
}

pub struct RelayFetcher {
    client: reqwest::Client,
    templates: Vec<RelayTemplate>,
    timeout: Duration,
}

impl RelayFetcher {
    pub fn new(templates: Vec<RelayTemplate>, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout)
            .build()
            .context("building relay http client")?;
        Ok(Self {
            client,
            templates,
            timeout,
        })
    }

    pub fn from_config(cfg: &RelayConfig) -> Result<Self> {
        let templates = cfg
            .templates
            .iter()
            .map(|t| RelayTemplate::new(t.as_str()))
            .collect();
        Self::new(templates, cfg.timeout(), &cfg.user_agent)
    }

    pub fn templates(&self) -> &[RelayTemplate] {
        &self.templates
    }

    async fn get_body(&self, url: String) -> Result<String> {
        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .context("relay get()")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("relay answered {status}"));
        }
        let body = resp.text().await.context("relay .text()")?;
        if body.is_empty() {
            return Err(anyhow!("relay answered with empty body"));
        }
        Ok(body)
    }
}

#[async_trait]
impl FeedFetcher for RelayFetcher {
    async fn fetch(&self, url: &str) -> Result<String, NewsError> {
        let target = ensure_scheme(url);
        let wrapped: Vec<String> = self.templates.iter().map(|t| t.wrap(&target)).collect();

        let res = first_success(wrapped, self.timeout, |u| self.get_body(u)).await;
        match res {
            Ok(body) => Ok(body),
            Err(attempts) => {
                counter!("news_relay_failures_total").increment(attempts as u64);
                Err(NewsError::FetchExhausted { target, attempts })
            }
        }
    }

    fn name(&self) -> &'static str {
        "relay"
    }
}
