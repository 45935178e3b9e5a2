//! Offer records and the status state machine
//!
//! ```text
//!            5 NO stock reports / manual
//!   active ───────────────────────────────► expired
//!     │    ◄───────────────────────────────   │
//!     │              manual only               │
//!     │ 5 abuse reports        5 abuse reports │
//!     ▼                                        │
//!  rejected (terminal) ◄───────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::LedgerError;

pub const DEFAULT_TITLE: &str = "Sin título";
pub const DEFAULT_STORE: &str = "Tienda Genérica";
pub const DEFAULT_CATEGORY: &str = "Varios";
pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    #[default]
    Active,
    Expired,
    Rejected,
}

/// What triggered a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    /// Negative stock reports crossed the expiry threshold
    StockReports,
    /// Abuse reports crossed the rejection threshold
    AbuseReports,
    /// Owner or admin set the status directly
    ManualOverride(OfferStatus),
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Active => "active",
            OfferStatus::Expired => "expired",
            OfferStatus::Rejected => "rejected",
        }
    }

    /// Resulting status after `cause`. Stock reports only expire an active
    /// offer; abuse reports reject any offer not already rejected. Manual
    /// overrides accept only active/expired targets and never leave `rejected`.
    pub fn transition(self, cause: TransitionCause) -> Result<OfferStatus, LedgerError> {
        match (self, cause) {
            (OfferStatus::Active, TransitionCause::StockReports) => Ok(OfferStatus::Expired),
            (OfferStatus::Active | OfferStatus::Expired, TransitionCause::AbuseReports) => {
                Ok(OfferStatus::Rejected)
            }
            (current, TransitionCause::StockReports | TransitionCause::AbuseReports) => Ok(current),
            (OfferStatus::Rejected, TransitionCause::ManualOverride(to)) => {
                Err(LedgerError::InvalidTransition {
                    from: OfferStatus::Rejected,
                    to,
                })
            }
            (from, TransitionCause::ManualOverride(OfferStatus::Rejected)) => {
                Err(LedgerError::InvalidTransition {
                    from,
                    to: OfferStatus::Rejected,
                })
            }
            (_, TransitionCause::ManualOverride(to)) => Ok(to),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OfferStatus::Rejected)
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfferStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(OfferStatus::Active),
            "expired" => Ok(OfferStatus::Expired),
            "rejected" => Ok(OfferStatus::Rejected),
            other => Err(LedgerError::Validation(format!("unknown offer status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub title: String,
    pub price: f64,
    pub status: OfferStatus,
    pub votes_count: i64,
    /// None for offers posted anonymously
    pub owner_id: Option<String>,
    pub store: String,
    pub category: String,
    pub category_slug: String,
    pub link: Option<String>,
    pub image_url: Option<String>,
    pub payment_methods: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id.as_deref() == Some(user_id)
    }
}

/// Raw offer form as submitted by a client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfferDraft {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub store: Option<String>,
    pub category: Option<String>,
    pub link: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub payment_methods: Vec<String>,
}

/// Validated offer ready for insertion
#[derive(Debug, Clone)]
pub struct NewOffer {
    pub title: String,
    pub price: f64,
    pub store: String,
    pub category: String,
    pub category_slug: String,
    pub link: Option<String>,
    pub image_url: Option<String>,
    pub payment_methods: Vec<String>,
    pub owner_id: Option<String>,
}

impl OfferDraft {
    /// Apply the form fallbacks and validate. Blank title, store and
    /// category fall back to defaults; price must be finite and >= 0.
    pub fn into_new_offer(self, owner_id: Option<String>) -> Result<NewOffer, LedgerError> {
        let price = validate_price(self.price.unwrap_or(0.0))?;
        let title = non_blank(self.title).unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let store = non_blank(self.store).unwrap_or_else(|| DEFAULT_STORE.to_string());
        let category = non_blank(self.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        let mut payment_methods: Vec<String> = self
            .payment_methods
            .into_iter()
            .filter_map(|p| non_blank(Some(p)))
            .collect();
        payment_methods.sort();
        payment_methods.dedup();

        Ok(NewOffer {
            title,
            price,
            store,
            category_slug: slugify(&category),
            category,
            link: non_blank(self.link),
            image_url: non_blank(self.image_url),
            payment_methods,
            owner_id,
        })
    }
}

/// Owner/admin edit of an existing offer. Unlike creation, edits carry
/// no fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferEdit {
    pub title: String,
    pub price: f64,
    pub store: String,
    pub category: String,
    pub link: Option<String>,
}

impl OfferEdit {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.title.trim().is_empty() {
            return Err(LedgerError::Validation("title is required".to_string()));
        }
        if self.store.trim().is_empty() {
            return Err(LedgerError::Validation("store is required".to_string()));
        }
        if self.category.trim().is_empty() {
            return Err(LedgerError::Validation("category is required".to_string()));
        }
        validate_price(self.price)?;
        Ok(())
    }

    pub fn category_slug(&self) -> String {
        slugify(&self.category)
    }

    pub fn normalized_link(&self) -> Option<String> {
        non_blank(self.link.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfferFilter {
    pub status: Option<OfferStatus>,
    /// Category slug
    pub category: Option<String>,
    /// Case-insensitive title substring
    pub q: Option<String>,
    pub limit: Option<u32>,
}

impl OfferFilter {
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }

    pub fn matches(&self, offer: &Offer) -> bool {
        if let Some(status) = self.status {
            if offer.status != status {
                return false;
            }
        }
        if let Some(ref slug) = self.category {
            if &offer.category_slug != slug {
                return false;
            }
        }
        if let Some(ref q) = self.q {
            if !offer.title.to_lowercase().contains(&q.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Category/payment slug: lowercase, trimmed, spaces become dashes
pub fn slugify(name: &str) -> String {
    name.to_lowercase().trim().replace(' ', "-")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_price(price: f64) -> Result<f64, LedgerError> {
    if !price.is_finite() || price < 0.0 {
        return Err(LedgerError::Validation(format!("invalid price: {}", price)));
    }
    Ok(price)
}
