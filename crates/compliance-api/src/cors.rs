use axum::http::HeaderValue;
use axum::http::request::Parts;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Origins allowed regardless of configuration.
pub const DEFAULT_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "https://agentic-compliance.vercel.app",
];

/// Credentialed CORS for the known frontends plus any Vercel preview deployment.
///
/// Credentials rule out wildcard methods and headers, so both mirror the
/// preflight request instead.
pub fn cors_layer(frontend_url: Option<String>) -> CorsLayer {
    let frontend = frontend_url.map(|u| u.trim_end_matches('/').to_string());
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|o| origin_allowed(o, frontend.as_deref()))
            },
        ))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn origin_allowed(origin: &str, frontend_url: Option<&str>) -> bool {
    DEFAULT_ORIGINS.contains(&origin)
        || frontend_url.is_some_and(|f| f == origin)
        || is_vercel_preview(origin)
}

/// `https://<label>.vercel.app` with a single DNS label.
fn is_vercel_preview(origin: &str) -> bool {
    origin
        .strip_prefix("https://")
        .and_then(|host| host.strip_suffix(".vercel.app"))
        .is_some_and(|label| {
            !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
