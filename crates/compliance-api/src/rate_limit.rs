//! Fixed-window rate limiting per client address.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;

use crate::error::AppError;

/// Table size at which expired buckets are pruned.
const PRUNE_AFTER_BUCKETS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per window.
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: u32,
    window_start: Instant,
}

/// Shared limiter state; clones share buckets.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count a request from `key`; `false` once the window is used up.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let window = self.config.window;
        let mut buckets = self.buckets.lock();

        if buckets.len() >= PRUNE_AFTER_BUCKETS {
            buckets.retain(|_, b| now.duration_since(b.window_start) < window);
        }

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            count: 0,
            window_start: now,
        });
        if now.duration_since(bucket.window_start) >= window {
            bucket.count = 0;
            bucket.window_start = now;
        }

        if bucket.count >= self.config.max_requests {
            false
        } else {
            bucket.count += 1;
            true
        }
    }
}

/// Client key: peer IP, else the first `X-Forwarded-For` hop, else `"anonymous"`.
pub fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("anonymous")
        .to_string()
}

/// Rejects requests over the limit with 429. A no-op when no [`RateLimiter`]
/// extension is installed.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    if let Some(limiter) = request.extensions().get::<RateLimiter>().cloned() {
        let key = client_key(&request);
        if !limiter.check(&key) {
            return AppError::RateLimited(key).into_response();
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
        })
    }

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let l = limiter(3);
        let now = Instant::now();
        assert!(l.check_at("a", now));
        assert!(l.check_at("a", now));
        assert!(l.check_at("a", now));
        assert!(!l.check_at("a", now));
    }

    #[test]
    fn keys_are_independent() {
        let l = limiter(1);
        let now = Instant::now();
        assert!(l.check_at("a", now));
        assert!(!l.check_at("a", now));
        assert!(l.check_at("b", now));
    }

    #[test]
    fn window_resets() {
        let l = limiter(1);
        let now = Instant::now();
        assert!(l.check_at("a", now));
        assert!(!l.check_at("a", now + Duration::from_secs(59)));
        assert!(l.check_at("a", now + Duration::from_secs(60)));
    }

    #[test]
    fn clones_share_buckets() {
        let l = limiter(1);
        let other = l.clone();
        let now = Instant::now();
        assert!(l.check_at("a", now));
        assert!(!other.check_at("a", now));
    }

    #[test]
    fn client_key_prefers_connect_info() {
        let mut request = http::Request::builder()
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 5555))));
        assert_eq!(client_key(&request), "10.0.0.7");
    }

    #[test]
    fn client_key_falls_back_to_forwarded_for_then_anonymous() {
        let forwarded = http::Request::builder()
            .header("x-forwarded-for", " 203.0.113.9 , 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&forwarded), "203.0.113.9");

        let bare = http::Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&bare), "anonymous");
    }
}
