//! Engagement endpoints: stock reports, favorites, abuse reports,
//! comments and the caller's own profile.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::ApiState;
use crate::api::identity::CallerIdentity;
use crate::error::LedgerError;
use crate::models::{
    Comment, FavoriteToggle, Offer, ReportOutcome, StockReportOutcome, StockStatus, StockSummary, UserProfile,
};

#[derive(Debug, Deserialize)]
pub struct StockReportRequest {
    pub status: StockStatus,
}

#[derive(Debug, Deserialize)]
pub struct AbuseReportRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub location: Option<String>,
}

pub async fn report_stock(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
    Path(offer_id): Path<Uuid>,
    Json(request): Json<StockReportRequest>,
) -> Result<Json<StockReportOutcome>, LedgerError> {
    Ok(Json(
        state
            .ledger
            .set_stock_report(&caller, offer_id, request.status)
            .await?,
    ))
}

pub async fn stock_summary(
    State(state): State<ApiState>,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<StockSummary>, LedgerError> {
    Ok(Json(state.ledger.stock_summary(offer_id).await?))
}

pub async fn toggle_favorite(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<FavoriteToggle>, LedgerError> {
    Ok(Json(state.ledger.toggle_favorite(&caller, offer_id).await?))
}

pub async fn file_report(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
    Path(offer_id): Path<Uuid>,
    Json(request): Json<AbuseReportRequest>,
) -> Result<(StatusCode, Json<ReportOutcome>), LedgerError> {
    let outcome = state
        .ledger
        .file_report(&caller, offer_id, &request.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn list_comments(
    State(state): State<ApiState>,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, LedgerError> {
    Ok(Json(state.ledger.list_comments(offer_id).await?))
}

pub async fn add_comment(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
    Path(offer_id): Path<Uuid>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), LedgerError> {
    let comment = state
        .ledger
        .add_comment(&caller, offer_id, &request.text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn my_favorites(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
) -> Result<Json<Vec<Offer>>, LedgerError> {
    Ok(Json(state.ledger.list_favorites(&caller).await?))
}

pub async fn update_profile(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<UserProfile>, LedgerError> {
    Ok(Json(
        state
            .ledger
            .update_location(&caller, request.location.as_deref())
            .await?,
    ))
}

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route(
            "/offers/{id}/stock-reports",
            get(stock_summary).post(report_stock),
        )
        .route("/offers/{id}/favorite", post(toggle_favorite))
        .route("/offers/{id}/reports", post(file_report))
        .route(
            "/offers/{id}/comments",
            get(list_comments).post(add_comment),
        )
        .route("/me/favorites", get(my_favorites))
        .route("/me/profile", put(update_profile))
}
