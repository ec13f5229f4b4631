use std::time::Instant;

use axum::Json;
use axum::extract::State;
use compliance_core::ComplianceResponse;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

/// Characters of the query echoed into the request log.
const LOGGED_QUERY_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
}

/// POST /analyze
///
/// If the client disconnects, axum drops this future and the in-flight
/// analysis is abandoned with it.
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<ComplianceResponse>, AppError> {
    let started = Instant::now();
    let preview: String = request.query.chars().take(LOGGED_QUERY_CHARS).collect();
    info!(query = %preview, "analyze request received");

    let response = state.analyst.analyze(&request.query).await?;

    info!(
        decision = %response.decision,
        risk = %response.analysis.risk_level,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "analyze request complete"
    );
    Ok(Json(response))
}
