use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::cache::CachedPayload;
use crate::curate::{CuratedBrief, SourceBrief};
use crate::engine::NewsEngine;
use crate::error::NewsError;
use crate::render;
use crate::search::{filter_by_query, search, SearchOutcome};
use crate::settings::ProviderPreference;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<NewsEngine>,
}

pub fn router(engine: Arc<NewsEngine>) -> Router {
    let state = AppState { engine };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/", get(latest_page))
        .route("/news-lab", get(news_lab_page))
        .route("/api/brief", get(get_brief))
        .route("/api/search", get(api_search))
        .route("/api/filter", get(api_filter))
        .route("/api/refresh", post(api_refresh))
        .route("/api/provider", post(api_provider))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// `NewsError` as an HTTP answer. Degraded states are 503 with a body that
/// points at the recovery actions; nothing here leaks a raw error page.
pub struct ApiError(NewsError);

impl From<NewsError> for ApiError {
    fn from(e: NewsError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            NewsError::InsufficientCacheData(_) => StatusCode::SERVICE_UNAVAILABLE,
            NewsError::AllSourcesFailed | NewsError::FetchExhausted { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "error": self.0.to_string(),
            "recovery": true,
            "actions": ["POST /api/refresh?force=true", "POST /api/provider {\"provider\":\"rss_only\"}"],
        });
        (status, Json(body)).into_response()
    }
}

fn cached(state: &AppState) -> Result<CachedPayload, ApiError> {
    state
        .engine
        .latest()
        .ok_or_else(|| NewsError::InsufficientCacheData("no brief yet".into()).into())
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    sentiment: String,
    #[serde(default)]
    region: String,
}

#[derive(Serialize)]
struct SearchResp {
    empty: bool,
    results: Vec<SourceBrief>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    stamp: String,
}

#[derive(Serialize)]
struct FilterResp {
    curated: Option<CuratedBrief>,
    stamp: String,
}

#[derive(Debug, Default, Deserialize)]
struct RefreshParams {
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderReq {
    #[serde(default)]
    provider: Option<String>,
}

#[derive(Serialize)]
struct ProviderResp {
    provider: String,
    strict_mode: bool,
    refreshed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn get_brief(State(state): State<AppState>) -> Result<Json<CachedPayload>, ApiError> {
    cached(&state).map(Json)
}

async fn api_search(
    State(state): State<AppState>,
    Query(p): Query<SearchParams>,
) -> Result<Json<SearchResp>, ApiError> {
    let payload = cached(&state)?;
    let resp = match search(&payload, &p.q, &p.sentiment, &p.region) {
        SearchOutcome::Matches(results) => SearchResp {
            empty: false,
            results,
            message: None,
            stamp: payload.stamp,
        },
        SearchOutcome::Empty => SearchResp {
            empty: true,
            results: Vec::new(),
            message: Some(render::EMPTY_STATE),
            stamp: payload.stamp,
        },
    };
    Ok(Json(resp))
}

async fn api_filter(
    State(state): State<AppState>,
    Query(p): Query<SearchParams>,
) -> Result<Json<FilterResp>, ApiError> {
    let payload = cached(&state)?;
    let curated = filter_by_query(&payload, &p.q, &p.region, &p.sentiment);
    Ok(Json(FilterResp {
        curated,
        stamp: payload.stamp,
    }))
}

async fn api_refresh(
    State(state): State<AppState>,
    Query(p): Query<RefreshParams>,
) -> Result<Json<CachedPayload>, ApiError> {
    let payload = state.engine.refresh(p.force).await?;
    Ok(Json(payload))
}

/// Accepts `?provider=` (recovery panel form) or a JSON body `{provider}`.
async fn api_provider(
    State(state): State<AppState>,
    Query(q): Query<ProviderReq>,
    body: Bytes,
) -> Response {
    let from_body = || {
        serde_json::from_slice::<ProviderReq>(&body)
            .ok()
            .and_then(|r| r.provider)
    };
    let Some(raw) = q.provider.or_else(from_body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "missing provider"})),
        )
            .into_response();
    };

    let pref = ProviderPreference::from(raw.as_str());
    let outcome = state.engine.reconfigure_provider(pref.clone()).await;
    let resp = ProviderResp {
        provider: pref.as_str().to_string(),
        strict_mode: state.engine.strict_mode(),
        refreshed: outcome.is_ok(),
        stamp: outcome.as_ref().ok().map(|p| p.stamp.clone()),
        error: outcome.err().map(|e| e.to_string()),
    };
    Json(resp).into_response()
}

async fn latest_page(State(state): State<AppState>) -> Html<String> {
    let engine = &state.engine;
    let latest = engine.latest();
    let body = if engine.recovery_needed() {
        let reason = if latest.is_none() { "Unavailable" } else { "Stale" };
        render::render_recovery(reason, engine.strict_mode())
    } else {
        render::render_latest(latest.as_ref())
    };
    Html(render::page("Latest brief", &body))
}

async fn news_lab_page(
    State(state): State<AppState>,
    Query(p): Query<SearchParams>,
) -> Html<String> {
    let body = match state.engine.latest() {
        Some(payload) => render::render_news_lab(&search(&payload, &p.q, &p.sentiment, &p.region)),
        None if state.engine.recovery_needed() => {
            render::render_recovery("Unavailable", state.engine.strict_mode())
        }
        None => render::render_latest(None),
    };
    Html(render::page("News lab", &body))
}
