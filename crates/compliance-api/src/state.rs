use std::sync::Arc;

use compliance_ai::Analyst;

use crate::rate_limit::RateLimitConfig;

/// Largest `/analyze` request body accepted.
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

/// HTTP-level settings. Pipeline settings live on the [`Analyst`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Deployed frontend origin, allowed through CORS alongside the defaults.
    pub frontend_url: Option<String>,
    /// `None` disables rate limiting.
    pub rate_limit: Option<RateLimitConfig>,
    pub body_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            frontend_url: None,
            rate_limit: Some(RateLimitConfig::default()),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub analyst: Arc<Analyst>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(analyst: Analyst, config: ApiConfig) -> Self {
        Self {
            analyst: Arc::new(analyst),
            config: Arc::new(config),
        }
    }
}
