//! PostgreSQL Database Module
//!
//! Provides persistence for offers, engagement records, users and push subscriptions.

pub mod engagement;
pub mod offers;
pub mod pool;
pub mod subscriptions;
pub mod users;

use async_trait::async_trait;
use uuid::Uuid;

pub use engagement::EngagementRepository;
pub use offers::OfferRepository;
pub use pool::DatabasePool;
pub use subscriptions::SubscriptionRepository;
pub use users::UserRepository;

use crate::error::LedgerError;
use crate::ledger::{LedgerStore, ModerationThresholds, SubscriptionStore};
use crate::models::{
    BoardStats, Comment, FavoriteToggle, NewOffer, NewSubscription, Offer, OfferEdit, OfferFilter,
    OfferStatus, PushSubscription, ReportOutcome, StockReportOutcome, StockStatus, StockSummary, UserProfile,
    UserSummary,
};

#[async_trait]
impl LedgerStore for DatabasePool {
    fn backend_tag(&self) -> &'static str {
        "postgres"
    }

    async fn insert_offer(&self, offer: NewOffer) -> Result<Offer, LedgerError> {
        self.offers().insert(offer).await
    }

    async fn get_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, LedgerError> {
        self.offers().get(offer_id).await
    }

    async fn list_offers(&self, filter: &OfferFilter) -> Result<Vec<Offer>, LedgerError> {
        self.offers().list(filter).await
    }

    async fn update_offer(&self, offer_id: Uuid, edit: &OfferEdit) -> Result<Offer, LedgerError> {
        self.offers().update(offer_id, edit).await
    }

    async fn delete_offer(&self, offer_id: Uuid) -> Result<(), LedgerError> {
        self.offers().delete(offer_id).await
    }

    async fn increment_votes(&self, offer_id: Uuid) -> Result<i64, LedgerError> {
        self.offers().increment_votes(offer_id).await
    }

    async fn override_status(&self, offer_id: Uuid, target: OfferStatus) -> Result<Offer, LedgerError> {
        self.offers().override_status(offer_id, target).await
    }

    async fn record_stock_report(
        &self,
        user_id: &str,
        offer_id: Uuid,
        status: StockStatus,
        thresholds: &ModerationThresholds,
    ) -> Result<StockReportOutcome, LedgerError> {
        self.engagement()
            .record_stock_report(user_id, offer_id, status, thresholds)
            .await
    }

    async fn stock_summary(&self, offer_id: Uuid) -> Result<StockSummary, LedgerError> {
        self.engagement().stock_summary(offer_id).await
    }

    async fn record_abuse_report(
        &self,
        user_id: &str,
        offer_id: Uuid,
        reason: &str,
        thresholds: &ModerationThresholds,
    ) -> Result<ReportOutcome, LedgerError> {
        self.engagement()
            .record_abuse_report(user_id, offer_id, reason, thresholds)
            .await
    }

    async fn toggle_favorite(&self, user_id: &str, offer_id: Uuid) -> Result<FavoriteToggle, LedgerError> {
        self.engagement().toggle_favorite(user_id, offer_id).await
    }

    async fn list_favorites(&self, user_id: &str) -> Result<Vec<Offer>, LedgerError> {
        self.engagement().list_favorites(user_id).await
    }

    async fn insert_comment(&self, user_id: &str, offer_id: Uuid, text: &str) -> Result<Comment, LedgerError> {
        self.engagement().insert_comment(user_id, offer_id, text).await
    }

    async fn list_comments(&self, offer_id: Uuid) -> Result<Vec<Comment>, LedgerError> {
        self.engagement().list_comments(offer_id).await
    }

    async fn upsert_profile(&self, user_id: &str, location: Option<&str>) -> Result<UserProfile, LedgerError> {
        self.engagement().upsert_profile(user_id, location).await
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, LedgerError> {
        self.users().list().await
    }

    async fn delete_user(&self, user_id: &str) -> Result<Vec<Uuid>, LedgerError> {
        self.users().delete(user_id).await
    }

    async fn board_stats(&self) -> Result<BoardStats, LedgerError> {
        self.users().stats().await
    }
}

#[async_trait]
impl SubscriptionStore for DatabasePool {
    async fn upsert_subscription(
        &self,
        subscription: &NewSubscription,
        user_id: Option<&str>,
    ) -> Result<PushSubscription, LedgerError> {
        self.subscriptions().upsert(subscription, user_id).await
    }

    async fn list_subscriptions(&self) -> Result<Vec<PushSubscription>, LedgerError> {
        self.subscriptions().list().await
    }

    async fn delete_subscription(&self, subscription_id: Uuid) -> Result<bool, LedgerError> {
        self.subscriptions().delete(subscription_id).await
    }
}
