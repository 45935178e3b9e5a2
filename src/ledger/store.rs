//! Persistence seam for the ledger
//!
//! Every method is one atomic unit. Offer-scoped mutations return
//! `LedgerError::NotFound` when the offer is missing. The report methods
//! evaluate the moderation thresholds inside the same transaction as the
//! write, so count-compare-update cannot interleave with another report
//! on the same offer.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::ledger::thresholds::ModerationThresholds;
use crate::models::{
    BoardStats, Comment, FavoriteToggle, NewOffer, NewSubscription, Offer, OfferEdit, OfferFilter,
    OfferStatus, PushSubscription, ReportOutcome, StockReportOutcome, StockStatus, StockSummary,
    UserProfile, UserSummary,
};

#[async_trait]
pub trait LedgerStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn insert_offer(&self, offer: NewOffer) -> Result<Offer, LedgerError>;

    async fn get_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, LedgerError>;

    async fn list_offers(&self, filter: &OfferFilter) -> Result<Vec<Offer>, LedgerError>;

    async fn update_offer(&self, offer_id: Uuid, edit: &OfferEdit) -> Result<Offer, LedgerError>;

    /// Removes the offer and every dependent row
    async fn delete_offer(&self, offer_id: Uuid) -> Result<(), LedgerError>;

    /// Returns the new vote count
    async fn increment_votes(&self, offer_id: Uuid) -> Result<i64, LedgerError>;

    /// Manual owner/admin status change, bypassing thresholds
    async fn override_status(&self, offer_id: Uuid, target: OfferStatus) -> Result<Offer, LedgerError>;

    /// Upsert the (user, offer) stock report, then apply the expiry rule
    async fn record_stock_report(
        &self,
        user_id: &str,
        offer_id: Uuid,
        status: StockStatus,
        thresholds: &ModerationThresholds,
    ) -> Result<StockReportOutcome, LedgerError>;

    async fn stock_summary(&self, offer_id: Uuid) -> Result<StockSummary, LedgerError>;

    /// Insert the (user, offer) abuse report, then apply the rejection rule.
    /// An existing report for the pair yields `DuplicateReport`.
    async fn record_abuse_report(
        &self,
        user_id: &str,
        offer_id: Uuid,
        reason: &str,
        thresholds: &ModerationThresholds,
    ) -> Result<ReportOutcome, LedgerError>;

    async fn toggle_favorite(&self, user_id: &str, offer_id: Uuid) -> Result<FavoriteToggle, LedgerError>;

    async fn list_favorites(&self, user_id: &str) -> Result<Vec<Offer>, LedgerError>;

    async fn insert_comment(&self, user_id: &str, offer_id: Uuid, text: &str) -> Result<Comment, LedgerError>;

    /// Oldest first
    async fn list_comments(&self, offer_id: Uuid) -> Result<Vec<Comment>, LedgerError>;

    async fn upsert_profile(&self, user_id: &str, location: Option<&str>) -> Result<UserProfile, LedgerError>;

    /// Everyone who left a trace: a profile, an offer, a report, a favorite
    /// or a comment. Sorted by user id.
    async fn list_users(&self) -> Result<Vec<UserSummary>, LedgerError>;

    /// Removes the user's offers (with their dependents) and everything the
    /// user wrote elsewhere. Returns the removed offer ids; an unknown user
    /// yields `NotFound`.
    async fn delete_user(&self, user_id: &str) -> Result<Vec<Uuid>, LedgerError>;

    async fn board_stats(&self) -> Result<BoardStats, LedgerError>;
}

/// Push subscription persistence
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Re-registering a known endpoint refreshes its keys and owner
    async fn upsert_subscription(
        &self,
        subscription: &NewSubscription,
        user_id: Option<&str>,
    ) -> Result<PushSubscription, LedgerError>;

    async fn list_subscriptions(&self) -> Result<Vec<PushSubscription>, LedgerError>;

    /// Returns whether a row was removed
    async fn delete_subscription(&self, subscription_id: Uuid) -> Result<bool, LedgerError>;
}
