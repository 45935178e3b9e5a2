//! Push subscription and alert endpoints
//!
//! Endpoints:
//!   GET  /notifications/vapid-public-key -> Application server key for subscribing
//!   POST /notifications/subscribe        -> Register a browser push subscription
//!   POST /admin/alerts                   -> Broadcast an alert (admin)

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::ApiState;
use crate::api::identity::CallerIdentity;
use crate::error::LedgerError;
use crate::models::NewSubscription;
use crate::notify::BroadcastReport;

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub subscription_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    pub public_key: String,
}

#[derive(Debug, Deserialize)]
pub struct AlertRequest {
    pub message: String,
    #[serde(default)]
    pub url: Option<String>,
}

pub async fn vapid_public_key(State(state): State<ApiState>) -> Result<Json<PublicKeyResponse>, LedgerError> {
    let public_key = state
        .notifications
        .vapid_public_key()
        .ok_or_else(|| LedgerError::NotFound {
            entity: "push key",
            id: "vapid".to_string(),
        })?;
    Ok(Json(PublicKeyResponse {
        public_key: public_key.to_string(),
    }))
}

pub async fn subscribe(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
    Json(subscription): Json<NewSubscription>,
) -> Result<(StatusCode, Json<SubscribeResponse>), LedgerError> {
    let stored = state.notifications.subscribe(&caller, subscription).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            success: true,
            subscription_id: stored.id,
        }),
    ))
}

pub async fn broadcast_alert(
    State(state): State<ApiState>,
    CallerIdentity(caller): CallerIdentity,
    Json(request): Json<AlertRequest>,
) -> Result<Json<BroadcastReport>, LedgerError> {
    let url = request.url.as_deref().unwrap_or("/");
    Ok(Json(
        state
            .notifications
            .broadcast_alert(&caller, &request.message, url)
            .await?,
    ))
}

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/notifications/vapid-public-key", get(vapid_public_key))
        .route("/notifications/subscribe", post(subscribe))
        .route("/admin/alerts", post(broadcast_alert))
}
