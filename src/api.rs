use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::analyze::{AnalyzeError, ClassifyError, EvidenceAnalyzer};
use crate::card::DiscoveryCard;
use crate::monitor::{DiscoveryFeed, DiscoveryMonitor};
use crate::seed::seed_discoveries;

pub const ORIGIN_HEADER: &str = "x-discovery-origin";

#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<DiscoveryMonitor>,
    /// Serve the curated seed list when the live feed is empty.
    pub serve_seed: bool,
    pub analyzer: Arc<EvidenceAnalyzer>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/discoveries/feed", get(feed).post(feed_refresh))
        .route("/api/discoveries/refresh", post(feed_refresh))
        .route("/api/discoveries/seed", get(seed))
        .route("/api/analyze", post(analyze))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct FeedQuery {
    #[serde(default)]
    refresh: Option<String>,
}

fn truthy(v: Option<&str>) -> bool {
    matches!(
        v.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes")
    )
}

#[derive(Debug, Serialize)]
struct FeedResp {
    success: bool,
    count: usize,
    discoveries: Vec<DiscoveryCard>,
    timestamp: String,
    origin: &'static str,
}

fn feed_response(discoveries: Vec<DiscoveryCard>, origin: &'static str) -> Response {
    let body = FeedResp {
        success: true,
        count: discoveries.len(),
        discoveries,
        timestamp: chrono::Utc::now().to_rfc3339(),
        origin,
    };
    let mut resp = Json(body).into_response();
    resp.headers_mut()
        .insert(ORIGIN_HEADER, HeaderValue::from_static(origin));
    resp
}

async fn serve(state: &AppState, force: bool) -> Response {
    let DiscoveryFeed {
        discoveries,
        origin,
    } = state.monitor.fetch(force).await;

    if discoveries.is_empty() && state.serve_seed {
        tracing::info!(target: "monitor", origin = origin.as_str(), "live feed empty, serving seed discoveries");
        return feed_response(seed_discoveries(), "seed");
    }
    feed_response(discoveries, origin.as_str())
}

async fn feed(State(state): State<AppState>, Query(q): Query<FeedQuery>) -> Response {
    serve(&state, truthy(q.refresh.as_deref())).await
}

async fn feed_refresh(State(state): State<AppState>) -> Response {
    serve(&state, true).await
}

async fn seed() -> Response {
    feed_response(seed_discoveries(), "seed")
}

#[derive(Debug, Serialize)]
struct ErrorResp {
    error: &'static str,
}

fn error_response(status: StatusCode, error: &'static str) -> Response {
    (status, Json(ErrorResp { error })).into_response()
}

/// `{ "text": string }`; anything else reads as missing text.
fn submitted_text(body: &[u8]) -> Option<String> {
    let v: serde_json::Value = serde_json::from_slice(body).ok()?;
    v.get("text")?.as_str().map(str::to_owned)
}

async fn analyze(State(state): State<AppState>, body: Bytes) -> Response {
    let text = submitted_text(&body).unwrap_or_default();
    match state.analyzer.analyze(&text).await {
        Ok(resp) => Json(resp).into_response(),
        Err(AnalyzeError::EmptyText) => {
            error_response(StatusCode::BAD_REQUEST, "Missing or invalid body: { text: string }")
        }
        Err(AnalyzeError::Classify(ClassifyError::MissingCredential)) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Analysis unavailable: no model configured.",
        ),
        Err(e) => {
            tracing::warn!(target: "classifier", kind = e.kind(), reason = %e, "analysis failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Analysis failed. Please try again.")
        }
    }
}
