//! Rate Limiting Middleware
//!
//! Implements sliding window rate limiting using DashMap for thread-safe
//! in-memory storage. Suitable for single-instance deployments.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Rate limiter configuration
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Window duration in seconds
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

/// Rate limit entry for a single client
#[derive(Clone)]
struct RateLimitEntry {
    request_count: u32,
    window_start: Instant,
}

/// In-memory rate limiter using DashMap
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let limiter = Self {
            entries: DashMap::new(),
            config,
        };

        let entries = limiter.entries.clone();
        let window_secs = limiter.config.window_secs;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(window_secs * 2));
            loop {
                interval.tick().await;
                let now = Instant::now();
                let window = Duration::from_secs(window_secs);
                entries.retain(|_, entry| now.duration_since(entry.window_start) < window);
            }
        });

        limiter
    }

    /// Check if a request should be allowed
    pub fn check_rate_limit(&self, client_id: &str) -> Result<RateLimitInfo, RateLimitExceeded> {
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_secs);

        let mut entry = self.entries.entry(client_id.to_string()).or_insert_with(|| RateLimitEntry {
            request_count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= window {
            entry.request_count = 0;
            entry.window_start = now;
        }

        entry.request_count += 1;

        let remaining = self.config.max_requests.saturating_sub(entry.request_count);
        let reset_secs =
            self.config.window_secs - now.duration_since(entry.window_start).as_secs().min(self.config.window_secs);

        if entry.request_count > self.config.max_requests {
            return Err(RateLimitExceeded { retry_after_secs: reset_secs });
        }

        Ok(RateLimitInfo {
            limit: self.config.max_requests,
            remaining,
            reset_secs,
        })
    }
}

pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset_secs: u64,
}

pub struct RateLimitExceeded {
    pub retry_after_secs: u64,
}

#[derive(Clone)]
pub struct RateLimiterState(pub Arc<RateLimiter>);

impl RateLimiterState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self(Arc::new(RateLimiter::new(config)))
    }

    pub fn default_api() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Rate limiting middleware keyed on `X-Forwarded-For`/`X-Real-IP`, falling
/// back to `"unknown"` when neither header is present.
pub async fn rate_limit_by_header(
    axum::extract::State(rate_limiter): axum::extract::State<RateLimiterState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let client_id = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            request
                .headers()
                .get("X-Real-IP")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string());

    match rate_limiter.0.check_rate_limit(&client_id) {
        Ok(info) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", info.limit.to_string().parse().unwrap());
            headers.insert("X-RateLimit-Remaining", info.remaining.to_string().parse().unwrap());
            headers.insert("X-RateLimit-Reset", info.reset_secs.to_string().parse().unwrap());
            Ok(response)
        }
        Err(exceeded) => {
            tracing::warn!(client = %client_id, retry_after = exceeded.retry_after_secs, "rate limit exceeded");

            let mut response = Response::builder()
                .status(StatusCode::TOO_MANY_REQUESTS)
                .body(Body::from("Too many requests. Please try again later."))
                .unwrap();

            response
                .headers_mut()
                .insert("Retry-After", exceeded.retry_after_secs.to_string().parse().unwrap());

            Ok(response)
        }
    }
}
