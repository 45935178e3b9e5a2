//! Admin moderation endpoints
//!
//! Endpoints:
//!   GET    /admin/users        -> Everyone the board has seen
//!   DELETE /admin/users/{id}   -> Ban a user and remove their offers
//!   GET    /admin/stats        -> User and offer counts
//!   GET    /admin/stale-views  -> Drain stale page paths

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};

use crate::api::ApiState;
use crate::api::identity::CallerIdentity;
use crate::cache::StaleView;
use crate::error::LedgerError;
use crate::ledger::ensure_admin;
use crate::models::{BanOutcome, BoardStats, UserSummary};

pub async fn list_users(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
) -> Result<Json<Vec<UserSummary>>, LedgerError> {
    Ok(Json(state.ledger.list_users(&caller).await?))
}

pub async fn ban_user(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
    Path(user_id): Path<String>,
) -> Result<Json<BanOutcome>, LedgerError> {
    Ok(Json(state.ledger.ban_user(&caller, &user_id).await?))
}

pub async fn stats(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
) -> Result<Json<BoardStats>, LedgerError> {
    Ok(Json(state.ledger.stats(&caller).await?))
}

pub async fn drain_stale_views(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
) -> Result<Json<Vec<StaleView>>, LedgerError> {
    ensure_admin(state.ledger.policy(), &caller)?;
    Ok(Json(state.views.drain()))
}

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/{user_id}", delete(ban_user))
        .route("/admin/stats", get(stats))
        .route("/admin/stale-views", get(drain_stale_views))
}
