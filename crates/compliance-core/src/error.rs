use thiserror::Error;

/// The regulation catalog could not be read or is not loaded.
///
/// This is an infrastructure failure, distinct from a node that references an
/// unknown article (which the validator recovers from locally).
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("regulation catalog is not loaded")]
    Unavailable,

    #[error("catalog file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid catalog entry: {0}")]
    InvalidEntry(String),
}

/// A reasoning node failed its structural invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("reasoning node field `{0}` must not be empty")]
    EmptyField(&'static str),
}

/// A scoring or decision policy was configured with impossible values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("weight for {regulation} must be finite and non-negative, got {value}")]
    Weight { regulation: String, value: f64 },

    #[error("risk cutoffs out of order: medium_at={medium_at} high_at={high_at}")]
    Cutoffs { medium_at: f64, high_at: f64 },

    #[error("{name} must lie in [0, 1], got {value}")]
    Probability { name: &'static str, value: f64 },

    #[error("empty_confidence must stay below 0.5, got {0}")]
    EmptyConfidence(f64),
}
