// src/curate/generator.rs
//! Structured generator: provider abstraction + daily limit + JSON extraction.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AiConfig;
use crate::curate::repair::repair_json;
use crate::error::NewsError;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// A remote text generator. Implementations classify their own failures
/// into `QuotaExceeded` / `GenerationUnavailable`.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate_text(&self, system: &str, user: &str) -> Result<String, NewsError>;
    /// Provider name for logs and metrics labels.
    fn name(&self) -> &'static str;
}

pub type DynGenerator = Arc<dyn Generator>;

const JSON_SCAFFOLD: &str =
    "Respond ONLY in valid JSON format. No prose. No markdown. No explanations.";

/// Ask for JSON and repair whatever comes back.
pub async fn generate_json(
    generator: &dyn Generator,
    system: &str,
    user: &str,
) -> Result<Value, NewsError> {
    let out = generator
        .generate_text(system, &format!("{JSON_SCAFFOLD}\n{user}"))
        .await?;
    repair_json(&out).ok_or_else(|| {
        NewsError::MalformedGenerationOutput(out.chars().take(200).collect())
    })
}

/// Factory: build a generator according to config and environment.
///
/// * `AI_TEST_MODE=mock` → deterministic mock answering a valid brief.
/// * `enabled == false` → disabled generator.
/// * `gemini` / `openai` → real provider wrapped with the daily limit.
pub fn build_generator(cfg: &AiConfig) -> DynGenerator {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockGenerator::always(MockReply::Text(
            MOCK_BRIEF.to_string(),
        )));
    }

    if !cfg.enabled {
        return Arc::new(DisabledGenerator);
    }

    let timeout = Duration::from_secs(cfg.timeout_secs.max(1));
    match cfg.provider.as_str() {
        "gemini" => Arc::new(DailyLimited::new(
            GeminiGenerator::new(cfg.api_key.clone(), cfg.model.clone(), timeout),
            cfg.daily_limit,
        )),
        "openai" => Arc::new(DailyLimited::new(
            OpenAiGenerator::new(
                cfg.api_key.clone(),
                cfg.model.clone(),
                cfg.base_url.clone(),
                timeout,
            ),
            cfg.daily_limit,
        )),
        "mock" => Arc::new(MockGenerator::always(MockReply::Text(
            MOCK_BRIEF.to_string(),
        ))),
        other => {
            tracing::warn!(provider = other, "unknown ai provider, generator disabled");
            Arc::new(DisabledGenerator)
        }
    }
}

const MOCK_BRIEF: &str = r#"{"brief":"Mock brief","bullets":["Mock bullet"],"regions":{"cities":[],"countries":["Worldwide"]},"verdict":"neutral","sentiment":"neutral","trending_topics":["mock"],"impact_level":"low","credibility_score":7,"links":[]}"#;

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("civic-news-curator/0.1")
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

async fn read_failure(resp: reqwest::Response) -> NewsError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    NewsError::from_generation_failure(Some(status), &body)
}

// ------------------------------------------------------------
// Concrete providers
// ------------------------------------------------------------

/// Gemini `generateContent`. Requires an API key.
pub struct GeminiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: Option<String>, timeout: Duration) -> Self {
        Self {
            http: http_client(timeout),
            api_key,
            model: model.unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate_text(&self, system: &str, user: &str) -> Result<String, NewsError> {
        if self.api_key.is_empty() {
            return Err(NewsError::GenerationUnavailable(
                "gemini api key missing".into(),
            ));
        }

        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            role: Option<&'a str>,
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenerationConfig {
            temperature: f32,
            response_mime_type: &'static str,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            system_instruction: Content<'a>,
            contents: Vec<Content<'a>>,
            generation_config: GenerationConfig,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Option<CandidateContent>,
        }
        #[derive(Deserialize)]
        struct CandidateContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: String,
        }

        let req = Req {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: user }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                response_mime_type: "application/json",
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url,
            self.model,
            urlencoding::encode(&self.api_key)
        );
        let resp = self
            .http
            .post(url)
            .json(&req)
            .send()
            .await
            .map_err(|e| NewsError::from_generation_failure(None, &e.to_string()))?;
        if !resp.status().is_success() {
            return Err(read_failure(resp).await);
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| NewsError::MalformedGenerationOutput(e.to_string()))?;
        let text: String = body
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(NewsError::MalformedGenerationOutput(
                "empty gemini completion".into(),
            ));
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// OpenAI-compatible chat completions (JSON response format).
pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiGenerator {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http: http_client(timeout),
            api_key,
            model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            base_url: base_url
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate_text(&self, system: &str, user: &str) -> Result<String, NewsError> {
        if self.api_key.is_empty() {
            return Err(NewsError::GenerationUnavailable(
                "openai api key missing".into(),
            ));
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            kind: &'static str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            response_format: ResponseFormat,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.2,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| NewsError::from_generation_failure(None, &e.to_string()))?;
        if !resp.status().is_success() {
            return Err(read_failure(resp).await);
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| NewsError::MalformedGenerationOutput(e.to_string()))?;
        match body.choices.into_iter().next().and_then(|c| c.message.content) {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(NewsError::MalformedGenerationOutput(
                "empty openai completion".into(),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Used when AI is disabled. Always unavailable.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    async fn generate_text(&self, _system: &str, _user: &str) -> Result<String, NewsError> {
        Err(NewsError::GenerationUnavailable("ai disabled".into()))
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// One scripted answer of the mock generator.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// Fails as if the provider answered with this error body.
    Fail { status: Option<u16>, body: String },
}

impl MockReply {
    fn into_result(self) -> Result<String, NewsError> {
        match self {
            MockReply::Text(t) => Ok(t),
            MockReply::Fail { status, body } => {
                Err(NewsError::from_generation_failure(status, &body))
            }
        }
    }
}

/// Deterministic generator for tests and local runs. Plays `script` in order,
/// then repeats `then` forever; counts every call.
pub struct MockGenerator {
    script: Mutex<VecDeque<MockReply>>,
    then: MockReply,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn always(reply: MockReply) -> Self {
        Self::scripted(Vec::new(), reply)
    }

    pub fn scripted(script: Vec<MockReply>, then: MockReply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            then,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate_text(&self, _system: &str, _user: &str) -> Result<String, NewsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();
        next.unwrap_or_else(|| self.then.clone()).into_result()
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Daily limit wrapper
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct DailyCounter {
    date: NaiveDate,
    count: u32,
}

/// Caps successful real calls per UTC day; beyond the cap the wrapper
/// answers `QuotaExceeded` without touching the provider.
pub struct DailyLimited<G: Generator> {
    inner: G,
    limit: u32,
    counter: Mutex<DailyCounter>,
}

impl<G: Generator> DailyLimited<G> {
    pub fn new(inner: G, limit: u32) -> Self {
        Self {
            inner,
            limit,
            counter: Mutex::new(DailyCounter {
                date: Utc::now().date_naive(),
                count: 0,
            }),
        }
    }

    fn admit(&self) -> bool {
        let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        let today = Utc::now().date_naive();
        if g.date != today {
            *g = DailyCounter {
                date: today,
                count: 0,
            };
        }
        g.count < self.limit
    }

    fn record_success(&self) {
        let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        g.count = g.count.saturating_add(1);
    }
}

#[async_trait]
impl<G: Generator> Generator for DailyLimited<G> {
    async fn generate_text(&self, system: &str, user: &str) -> Result<String, NewsError> {
        if !self.admit() {
            return Err(NewsError::QuotaExceeded(format!(
                "daily limit of {} calls reached",
                self.limit
            )));
        }
        let out = self.inner.generate_text(system, user).await?;
        self.record_success();
        Ok(out)
    }
    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
