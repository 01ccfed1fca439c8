//! Web server: Axum router + shared state.

pub mod api;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use moodlens_core::{AnalysisEngine, SharedMethod};

/// Shared application state: the engine and the selectable method it reads.
pub struct AppState {
    pub engine: AnalysisEngine,
    pub method: SharedMethod,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::very_permissive();

    Router::new()
        .merge(api::routes())
        .layer(cors)
        .with_state(state)
}
