//! Per-user engagement records: stock reports, abuse reports, favorites,
//! comments. Each (user, offer) pair holds at most one stock report, one
//! abuse report and one favorite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::offer::OfferStatus;
use crate::error::LedgerError;

/// User attestation of product availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StockStatus {
    Yes,
    No,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Yes => "YES",
            StockStatus::No => "NO",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "YES" => Ok(StockStatus::Yes),
            "NO" => Ok(StockStatus::No),
            other => Err(LedgerError::Validation(format!("unknown stock status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReport {
    pub user_id: String,
    pub offer_id: Uuid,
    pub status: StockStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbuseReport {
    pub id: Uuid,
    pub user_id: String,
    pub offer_id: Uuid,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub user_id: String,
    pub offer_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub user_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Result of `set_stock_report`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReportOutcome {
    pub status: StockStatus,
    /// Distinct users currently reporting NO
    pub negative_reports: u64,
    pub offer_status: OfferStatus,
    /// This report moved the offer to expired
    pub transitioned: bool,
}

/// Result of `file_report`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutcome {
    pub total_reports: u64,
    pub offer_status: OfferStatus,
    pub transitioned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteToggle {
    pub added: bool,
}

/// YES/NO tallies behind the stock traffic light
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummary {
    pub yes: u64,
    pub no: u64,
}

impl StockSummary {
    pub fn record(&mut self, status: StockStatus) {
        match status {
            StockStatus::Yes => self.yes += 1,
            StockStatus::No => self.no += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_status_wire_format() {
        assert_eq!(serde_json::to_string(&StockStatus::No).unwrap(), "\"NO\"");
        let parsed: StockStatus = serde_json::from_str("\"YES\"").unwrap();
        assert_eq!(parsed, StockStatus::Yes);
        assert_eq!("NO".parse::<StockStatus>().unwrap(), StockStatus::No);
        assert!("maybe".parse::<StockStatus>().is_err());
    }

    #[test]
    fn test_stock_summary_record() {
        let mut summary = StockSummary::default();
        summary.record(StockStatus::No);
        summary.record(StockStatus::No);
        summary.record(StockStatus::Yes);
        assert_eq!(summary, StockSummary { yes: 1, no: 2 });
    }
}
