//! # compliance-api
//!
//! HTTP surface for the compliance agent.
//!
//! - `GET /health`, `GET /metrics`, `GET /`: status endpoints
//! - `POST /analyze`: run a query through the [`Analyst`](compliance_ai::Analyst)
//!
//! Middleware, outermost first: CORS → TraceLayer → (on `/analyze` only)
//! rate limit → body limit → handler.

pub mod cors;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod state;

use std::future::Future;
use std::net::SocketAddr;

use axum::{Extension, Router};
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::AppError;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use state::{ApiConfig, AppState};

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let mut analyze = Router::new()
        .route("/analyze", post(routes::analyze::analyze))
        .layer(DefaultBodyLimit::max(state.config.body_limit));

    if let Some(config) = &state.config.rate_limit {
        analyze = analyze
            .layer(from_fn(rate_limit::rate_limit_middleware))
            .layer(Extension(RateLimiter::new(config.clone())));
    }

    Router::new()
        .route("/", get(routes::status::root))
        .route("/health", get(routes::status::health))
        .route("/metrics", get(routes::status::metrics))
        .merge(analyze)
        .layer(TraceLayer::new_for_http())
        .layer(cors::cors_layer(state.config.frontend_url.clone()))
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(state: AppState, addr: SocketAddr, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "compliance API listening");
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    info!("compliance API stopped");
    Ok(())
}
