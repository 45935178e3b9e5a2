use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// Identity of whoever issued a request. The upstream auth gateway
/// supplies an opaque user identifier; requests without one are anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller(Option<String>);

impl Caller {
    pub fn anonymous() -> Self {
        Caller(None)
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Caller(Some(user_id.into()))
    }

    pub fn user_id(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_none()
    }

    pub fn require_user(&self) -> Result<&str, LedgerError> {
        self.user_id().ok_or(LedgerError::Unauthenticated)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub location: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// One known user as seen by moderators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: String,
    pub location: Option<String>,
    /// Offers published by this user
    pub offer_count: u64,
    /// Filled in by the ledger from the admin policy
    #[serde(default)]
    pub is_admin: bool,
}

impl UserSummary {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            location: None,
            offer_count: 0,
            is_admin: false,
        }
    }
}

/// Board-wide counts for the admin dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardStats {
    pub users: u64,
    pub offers: u64,
    pub active_offers: u64,
    pub expired_offers: u64,
    pub rejected_offers: u64,
}

/// Result of banning a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanOutcome {
    pub user_id: String,
    /// Offers that went away with the user
    pub removed_offers: Vec<Uuid>,
}
