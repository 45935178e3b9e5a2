//! HTTP middleware
//!
//! Provides:
//! - Gateway token check guarding the `x-user-id` identity header
//! - Rate limiting of mutating requests per verified user, otherwise per IP
//! - Request body size limits
//! - Security headers
//! - Request logging with sanitization

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::api::identity::USER_ID_HEADER;
use crate::config::sanitize_for_logging;

pub const GATEWAY_TOKEN_HEADER: &str = "x-gateway-token";

#[derive(Debug, Clone)]
pub struct SecurityMiddlewareConfig {
    /// Shared secret the auth gateway sends alongside `x-user-id`.
    /// When unset the identity header is trusted as-is.
    pub gateway_token: Option<String>,
    /// Mutating requests per minute per caller
    pub rate_limit_per_minute: u32,
    pub max_request_size: usize,
    pub log_requests: bool,
    pub sanitize_logs: bool,
    /// Paths exempt from the gateway check
    pub public_paths: Vec<String>,
}

impl Default for SecurityMiddlewareConfig {
    fn default() -> Self {
        Self {
            gateway_token: None,
            rate_limit_per_minute: 30,
            max_request_size: 64 * 1024,
            log_requests: true,
            sanitize_logs: true,
            public_paths: vec!["/health".to_string()],
        }
    }
}

/// Fixed-window counter per caller key
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, (u32, Instant)>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self::with_window(requests_per_minute, Duration::from_secs(60))
    }

    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
        }
    }

    /// Returns (allowed, remaining, reset_after_secs)
    pub fn check(&self, key: &str) -> (bool, u32, u64) {
        let now = Instant::now();
        let mut entry = self.windows.entry(key.to_string()).or_insert((0, now));
        let (count, started) = entry.value_mut();

        if now.duration_since(*started) >= self.window {
            *count = 0;
            *started = now;
        }

        let reset_after = self
            .window
            .saturating_sub(now.duration_since(*started))
            .as_secs();

        if *count >= self.limit {
            return (false, 0, reset_after);
        }

        *count += 1;
        (true, self.limit - *count, reset_after)
    }

    /// Drop windows idle for two periods
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.windows
            .retain(|_, (_, started)| now.duration_since(*started) < self.window * 2);
    }

    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

#[derive(Clone)]
pub struct SecurityState {
    pub config: SecurityMiddlewareConfig,
    pub rate_limiter: Arc<RateLimiter>,
}

impl SecurityState {
    pub fn new(config: SecurityMiddlewareConfig) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute));
        Self { config, rate_limiter }
    }
}

fn client_ip(headers: &HeaderMap, request: &Request) -> String {
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return ip.trim().to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn claimed_user(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|user| !user.is_empty())
}

/// Callers are limited per user only when the gateway vouches for the
/// identity header; otherwise a rotating header would mint fresh buckets.
fn rate_key(headers: &HeaderMap, request: &Request, identity_verified: bool) -> String {
    match claimed_user(headers) {
        Some(user) if identity_verified => format!("user:{}", user),
        _ => format!("ip:{}", client_ip(headers, request)),
    }
}

/// Log label: the claimed user when present, else the client IP
fn caller_label(headers: &HeaderMap, request: &Request) -> String {
    match claimed_user(headers) {
        Some(user) => format!("user:{}", user),
        None => format!("ip:{}", client_ip(headers, request)),
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

fn is_public_path(path: &str, public_paths: &[String]) -> bool {
    public_paths.iter().any(|p| path.starts_with(p.as_str()))
}

fn tokens_match(expected: &str, presented: &str) -> bool {
    expected.len() == presented.len()
        && expected
            .bytes()
            .zip(presented.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Reject identity headers that did not come through the gateway
pub async fn gateway_middleware(
    State(state): State<SecurityState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.gateway_token.as_deref() else {
        return next.run(request).await;
    };
    if is_public_path(request.uri().path(), &state.config.public_paths)
        || !headers.contains_key(USER_ID_HEADER)
    {
        return next.run(request).await;
    }

    let presented = headers
        .get(GATEWAY_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if tokens_match(expected, presented) {
        debug!(path = %request.uri().path(), "Gateway identity accepted");
        next.run(request).await
    } else {
        warn!(path = %request.uri().path(), "Identity header without valid gateway token");
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "untrusted identity header" })),
        )
            .into_response()
    }
}

pub async fn rate_limit_middleware(
    State(state): State<SecurityState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if !is_mutating(request.method()) {
        return next.run(request).await;
    }

    let key = rate_key(&headers, &request, state.config.gateway_token.is_some());
    let (allowed, remaining, reset_after) = state.rate_limiter.check(&key);
    let limit = state.config.rate_limit_per_minute;

    let mut response = if allowed {
        next.run(request).await
    } else {
        warn!(
            caller = %sanitize_for_logging(&key, state.config.sanitize_logs),
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "too many requests" })),
        )
            .into_response();
        response
            .headers_mut()
            .insert("Retry-After", HeaderValue::from(reset_after));
        response
    };

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(reset_after));
    response
}

pub async fn body_size_middleware(
    State(state): State<SecurityState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let declared = headers
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(length) = declared
        && length > state.config.max_request_size
    {
        warn!(length, max = state.config.max_request_size, "Request body too large");
        return StatusCode::PAYLOAD_TOO_LARGE.into_response();
    }

    next.run(request).await
}

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("Referrer-Policy", HeaderValue::from_static("strict-origin-when-cross-origin"));
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    // Listings change with every vote
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));
    headers.remove("Server");

    response
}

pub async fn logging_middleware(
    State(state): State<SecurityState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.log_requests {
        return next.run(request).await;
    }

    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let caller = sanitize_for_logging(&caller_label(&headers, &request), state.config.sanitize_logs);

    let response = next.run(request).await;
    let duration_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        error!(method = %method, path = %path, status, duration_ms, caller = %caller, "Request failed");
    } else if response.status().is_client_error() {
        warn!(method = %method, path = %path, status, duration_ms, caller = %caller, "Client error");
    } else {
        info!(method = %method, path = %path, status, duration_ms, caller = %caller, "Request completed");
    }

    response
}
