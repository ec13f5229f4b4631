//! Unauthenticated status endpoints.

use axum::Json;
use serde::Serialize;

pub const SERVICE_NAME: &str = "compliance-agent";

/// Release line reported to clients, e.g. `v2.0`.
fn version_tag() -> String {
    format!(
        "v{}.{}",
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR")
    )
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Metrics {
    pub status: &'static str,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct Banner {
    pub message: String,
}

/// GET /health
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        service: SERVICE_NAME,
    })
}

/// GET /metrics
pub async fn metrics() -> Json<Metrics> {
    Json(Metrics {
        status: "running",
        version: version_tag(),
    })
}

/// GET /
pub async fn root() -> Json<Banner> {
    Json(Banner {
        message: format!("Agentic Compliance API {} - Active", version_tag()),
    })
}
