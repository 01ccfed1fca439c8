//! REST API endpoints over the analysis engine.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use moodlens_core::{AnalysisMethod, AnalysisResult, CacheStats, StrategyStatus};

use super::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/analyze", post(post_analyze))
        .route("/api/analyze/batch", post(post_analyze_batch))
        .route("/api/status", get(get_status))
        .route("/api/cache", get(get_cache).delete(delete_cache))
        .route("/api/method", get(get_method).put(put_method))
}

#[derive(Deserialize)]
struct AnalyzeBody {
    content: String,
}

#[derive(Deserialize)]
struct BatchBody {
    contents: Vec<String>,
}

#[derive(Deserialize)]
struct MethodBody {
    method: String,
}

// --- Analysis ---

async fn post_analyze(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnalyzeBody>,
) -> Json<AnalysisResult> {
    Json(state.engine.analyze(&body.content).await)
}

async fn post_analyze_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BatchBody>,
) -> Json<Vec<AnalysisResult>> {
    Json(state.engine.analyze_batch(&body.contents).await)
}

// --- Diagnostics ---

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StrategyStatus> {
    Json(state.engine.strategy_status().await)
}

async fn get_cache(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.engine.cache_stats())
}

async fn delete_cache(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.engine.clear_cache();
    Json(json!({"ok": true}))
}

// --- Method selection ---

async fn get_method(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({"method": state.engine.current_method()}))
}

async fn put_method(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MethodBody>,
) -> (StatusCode, Json<Value>) {
    match body.method.parse::<AnalysisMethod>() {
        Ok(method) => {
            state.method.set(method);
            (StatusCode::OK, Json(json!({"ok": true, "method": method})))
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "error": e.to_string()})),
        ),
    }
}
