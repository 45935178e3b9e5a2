use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::error::LedgerError;

impl LedgerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::Unauthenticated => StatusCode::UNAUTHORIZED,
            LedgerError::Forbidden(_) => StatusCode::FORBIDDEN,
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::DuplicateReport => StatusCode::CONFLICT,
            LedgerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::InvalidTransition { .. } => StatusCode::CONFLICT,
            LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            LedgerError::DuplicateReport => "already reported".to_string(),
            LedgerError::Storage(detail) => {
                error!(error = %detail, "Storage failure");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OfferStatus;
    use http_body_util::BodyExt;

    async fn body_of(err: LedgerError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_duplicate_report_body() {
        let (status, body) = body_of(LedgerError::DuplicateReport).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, json!({ "error": "already reported" }));
    }

    #[tokio::test]
    async fn test_storage_detail_hidden() {
        let (status, body) = body_of(LedgerError::Storage("connection reset by peer".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal error");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(LedgerError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            LedgerError::Forbidden("luis".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            LedgerError::Validation("price".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            LedgerError::InvalidTransition {
                from: OfferStatus::Rejected,
                to: OfferStatus::Active,
            }
            .status_code(),
            StatusCode::CONFLICT
        );
    }
}
