//! Moderation thresholds
//!
//! An offer expires once enough distinct users report it out of stock and
//! is rejected once enough distinct users flag it for abuse. Expiry only
//! moves active offers; rejection also catches expired ones so an owner
//! cannot revive a flagged offer. See `OfferStatus::transition`.

use serde::{Deserialize, Serialize};

use crate::models::{OfferStatus, TransitionCause};

/// Operator-configurable thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationThresholds {
    /// Distinct NO stock reports that expire an offer
    pub stock_expiry_threshold: u64,

    /// Distinct abuse reports that reject an offer
    pub abuse_rejection_threshold: u64,
}

impl Default for ModerationThresholds {
    fn default() -> Self {
        Self {
            stock_expiry_threshold: 5,
            abuse_rejection_threshold: 5,
        }
    }
}

impl ModerationThresholds {
    /// Status after a NO report brought the tally to `negative_reports`
    pub fn status_after_stock_reports(&self, current: OfferStatus, negative_reports: u64) -> OfferStatus {
        if negative_reports < self.stock_expiry_threshold {
            return current;
        }
        current
            .transition(TransitionCause::StockReports)
            .unwrap_or(current)
    }

    /// Status after an abuse report brought the tally to `total_reports`
    pub fn status_after_abuse_reports(&self, current: OfferStatus, total_reports: u64) -> OfferStatus {
        if total_reports < self.abuse_rejection_threshold {
            return current;
        }
        current
            .transition(TransitionCause::AbuseReports)
            .unwrap_or(current)
    }
}
