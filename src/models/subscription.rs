use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// Browser push subscription as registered by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: Uuid,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Shape of the browser `PushSubscription.toJSON()` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

impl NewSubscription {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.endpoint.trim().is_empty() {
            return Err(LedgerError::Validation("subscription endpoint is required".to_string()));
        }
        if self.keys.p256dh.is_empty() || self.keys.auth.is_empty() {
            return Err(LedgerError::Validation("subscription keys are required".to_string()));
        }
        Ok(())
    }
}
