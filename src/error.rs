//! Ledger error kinds
//!
//! Every ledger, store and notification operation returns `LedgerError`.
//! `DuplicateReport` is a recoverable, user-facing condition; everything
//! else aborts the operation with no partial effect.

use thiserror::Error;
use uuid::Uuid;

use crate::models::OfferStatus;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Operation requires a signed-in caller
    #[error("authentication required")]
    Unauthenticated,

    /// Caller is neither the owner nor an admin
    #[error("not authorized: {0}")]
    Forbidden(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Same user already reported the same offer
    #[error("offer already reported by this user")]
    DuplicateReport,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("offer status cannot move from {from} to {to}")]
    InvalidTransition { from: OfferStatus, to: OfferStatus },

    /// Underlying store failure, propagated unchanged
    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn offer_not_found(offer_id: Uuid) -> Self {
        LedgerError::NotFound {
            entity: "offer",
            id: offer_id.to_string(),
        }
    }

    /// Both anonymous and non-owner refusals count as "unauthorized"
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, LedgerError::Unauthenticated | LedgerError::Forbidden(_))
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, LedgerError::DuplicateReport)
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_grouping() {
        assert!(LedgerError::Unauthenticated.is_unauthorized());
        assert!(LedgerError::Forbidden("x".to_string()).is_unauthorized());
        assert!(!LedgerError::DuplicateReport.is_unauthorized());
    }

    #[test]
    fn test_messages() {
        let id = Uuid::nil();
        let err = LedgerError::offer_not_found(id);
        assert_eq!(err.to_string(), format!("offer not found: {}", id));

        let err = LedgerError::InvalidTransition {
            from: OfferStatus::Rejected,
            to: OfferStatus::Active,
        };
        assert_eq!(err.to_string(), "offer status cannot move from rejected to active");
        assert!(LedgerError::DuplicateReport.is_recoverable());
    }
}
