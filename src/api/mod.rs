//! HTTP API for the deal board
//!
//! Provides REST endpoints for:
//! - Offers (publish, browse, edit, vote, owner stock override)
//! - Engagement (stock reports, favorites, abuse reports, comments, profile)
//! - Push subscriptions and admin alerts
//! - Admin moderation (users, bans, stats, stale views)
//! - Middleware (gateway identity check, rate limiting, headers, logging)

pub mod admin;
pub mod engagement;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod notifications;
pub mod offers;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::sync::Arc;

use crate::cache::StaleViewRegistry;
use crate::ledger::ModerationLedger;
use crate::notify::NotificationService;

pub use identity::{CallerIdentity, USER_ID_HEADER};
pub use middleware::{
    GATEWAY_TOKEN_HEADER, RateLimiter, SecurityMiddlewareConfig, SecurityState, body_size_middleware,
    gateway_middleware, logging_middleware, rate_limit_middleware, security_headers_middleware,
};

#[derive(Clone)]
pub struct ApiState {
    pub ledger: Arc<ModerationLedger>,
    pub notifications: Arc<NotificationService>,
    pub views: Arc<StaleViewRegistry>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub stale_views: usize,
    pub timestamp: String,
}

pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.ledger.backend_tag(),
        stale_views: state.views.len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// All routes, without the security layers (applied by the binary)
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(offers::routes())
        .merge(engagement::routes())
        .merge(notifications::routes())
        .merge(admin::routes())
        .with_state(state)
}
