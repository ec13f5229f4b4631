use std::time::Duration;

use compliance_core::CatalogError;
use thiserror::Error;

/// The extraction capability failed. Callers never see partial output.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("extraction backend failed: {0}")]
    Backend(String),

    #[cfg(feature = "llm")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("malformed extraction output: {0}")]
    Malformed(String),
}

/// Why an analysis produced no result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("analysis cancelled")]
    Cancelled,
}
