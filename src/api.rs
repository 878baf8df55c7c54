use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::analyze::EmailAnalyzer;
use crate::report::AnalysisResult;

#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<EmailAnalyzer>,
}

impl AppState {
    pub fn new(analyzer: EmailAnalyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }
}

/// Build the router with an analyzer wired from `config/ai.json`.
pub fn create_router() -> Router {
    router_with_state(AppState::new(EmailAnalyzer::from_config()))
}

pub fn router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/analyze", post(analyze))
        .route("/analyze/batch", post(analyze_batch))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
pub struct AnalyzeReq {
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
}

/// One email of a bulk request; `id` is the caller's correlation handle.
#[derive(Deserialize)]
pub struct BatchItem {
    id: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
}

#[derive(Serialize)]
pub struct BatchResult {
    id: String,
    result: AnalysisResult,
}

async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeReq>,
) -> Json<AnalysisResult> {
    Json(state.analyzer.analyze_email(&req.subject, &req.body).await)
}

/// Bulk processing is just N independent invocations of the same entry point;
/// nothing is shared across items.
async fn analyze_batch(
    State(state): State<AppState>,
    Json(items): Json<Vec<BatchItem>>,
) -> Json<Vec<BatchResult>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let result = state.analyzer.analyze_email(&item.subject, &item.body).await;
        out.push(BatchResult {
            id: item.id,
            result,
        });
    }
    Json(out)
}
