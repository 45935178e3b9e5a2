//! Offer endpoints
//!
//! Endpoints:
//!   GET    /offers             -> List offers (status, category, q, limit)
//!   POST   /offers             -> Publish an offer
//!   GET    /offers/{id}        -> Offer detail
//!   PUT    /offers/{id}        -> Edit an offer (owner/admin)
//!   DELETE /offers/{id}        -> Delete an offer (owner/admin)
//!   POST   /offers/{id}/vote   -> Add one vote
//!   PUT    /offers/{id}/stock  -> Mark active/expired (owner/admin)

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::ApiState;
use crate::api::identity::CallerIdentity;
use crate::error::LedgerError;
use crate::models::{Offer, OfferDraft, OfferEdit, OfferFilter, OfferStatus};

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponse {
    pub offer_id: Uuid,
    pub votes_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub status: OfferStatus,
}

pub async fn list_offers(
    State(state): State<ApiState>,
    Query(filter): Query<OfferFilter>,
) -> Result<Json<Vec<Offer>>, LedgerError> {
    Ok(Json(state.ledger.list_offers(&filter).await?))
}

pub async fn create_offer(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
    Json(draft): Json<OfferDraft>,
) -> Result<(StatusCode, Json<Offer>), LedgerError> {
    let offer = state.ledger.create_offer(&caller, draft).await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

pub async fn get_offer(
    State(state): State<ApiState>,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<Offer>, LedgerError> {
    Ok(Json(state.ledger.get_offer(offer_id).await?))
}

pub async fn update_offer(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
    Path(offer_id): Path<Uuid>,
    Json(edit): Json<OfferEdit>,
) -> Result<Json<Offer>, LedgerError> {
    Ok(Json(state.ledger.update_offer(&caller, offer_id, edit).await?))
}

pub async fn delete_offer(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
    Path(offer_id): Path<Uuid>,
) -> Result<StatusCode, LedgerError> {
    state.ledger.delete_offer(&caller, offer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn vote(
    State(state): State<ApiState>,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<VoteResponse>, LedgerError> {
    let votes_count = state.ledger.record_vote(offer_id).await?;
    Ok(Json(VoteResponse { offer_id, votes_count }))
}

pub async fn set_stock(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
    Path(offer_id): Path<Uuid>,
    Json(request): Json<SetStockRequest>,
) -> Result<Json<Offer>, LedgerError> {
    Ok(Json(
        state
            .ledger
            .set_offer_stock(&caller, offer_id, request.status)
            .await?,
    ))
}

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/offers", get(list_offers).post(create_offer))
        .route(
            "/offers/{id}",
            get(get_offer).put(update_offer).delete(delete_offer),
        )
        .route("/offers/{id}/vote", post(vote))
        .route("/offers/{id}/stock", put(set_stock))
}
