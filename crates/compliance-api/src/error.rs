//! Maps pipeline failures onto the JSON error bodies clients see.
//!
//! Internal error text never leaves the server: it is logged here and the
//! client gets a fixed `detail` string.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use compliance_ai::AnalysisError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

pub const ANALYSIS_FAILED: &str = "Error processing compliance request";
pub const RATE_LIMITED: &str = "Rate limit exceeded";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("rate limit exceeded for {0}")]
    RateLimited(String),
}

/// `{"detail": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::Analysis(e) => {
                error!(error = %e, "analysis request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ANALYSIS_FAILED)
            }
            AppError::RateLimited(client) => {
                warn!(client = %client, "rate limit exceeded");
                (StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED)
            }
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}
