//! In-memory ledger store
//!
//! Used when PostgreSQL is disabled and throughout the tests. A single
//! mutex guards all tables for the duration of each operation, which
//! gives the same per-operation atomicity as a database transaction.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::ledger::store::{LedgerStore, SubscriptionStore};
use crate::ledger::thresholds::ModerationThresholds;
use crate::models::{
    AbuseReport, BoardStats, Comment, Favorite, FavoriteToggle, NewOffer, NewSubscription, Offer, OfferEdit,
    OfferFilter, OfferStatus, PushSubscription, ReportOutcome, StockReport, StockReportOutcome,
    StockStatus, StockSummary, TransitionCause, UserProfile, UserSummary,
};

type PairKey = (String, Uuid);

#[derive(Debug, Default)]
struct Tables {
    offers: HashMap<Uuid, Offer>,
    stock_reports: HashMap<PairKey, StockReport>,
    abuse_reports: HashMap<PairKey, AbuseReport>,
    favorites: HashMap<PairKey, Favorite>,
    comments: Vec<Comment>,
    profiles: HashMap<String, UserProfile>,
    subscriptions: HashMap<String, PushSubscription>,
}

impl Tables {
    fn offer_mut(&mut self, offer_id: Uuid) -> Result<&mut Offer, LedgerError> {
        self.offers
            .get_mut(&offer_id)
            .ok_or_else(|| LedgerError::offer_not_found(offer_id))
    }

    fn ensure_offer(&self, offer_id: Uuid) -> Result<(), LedgerError> {
        if self.offers.contains_key(&offer_id) {
            Ok(())
        } else {
            Err(LedgerError::offer_not_found(offer_id))
        }
    }

    fn negative_reports(&self, offer_id: Uuid) -> u64 {
        self.stock_reports
            .values()
            .filter(|r| r.offer_id == offer_id && r.status == StockStatus::No)
            .count() as u64
    }

    fn abuse_reports(&self, offer_id: Uuid) -> u64 {
        self.abuse_reports
            .values()
            .filter(|r| r.offer_id == offer_id)
            .count() as u64
    }

    fn remove_offer(&mut self, offer_id: Uuid) -> bool {
        if self.offers.remove(&offer_id).is_none() {
            return false;
        }
        self.stock_reports.retain(|(_, id), _| *id != offer_id);
        self.abuse_reports.retain(|(_, id), _| *id != offer_id);
        self.favorites.retain(|(_, id), _| *id != offer_id);
        self.comments.retain(|c| c.offer_id != offer_id);
        true
    }

    fn known_users(&self) -> BTreeMap<String, UserSummary> {
        let mut users: BTreeMap<String, UserSummary> = BTreeMap::new();
        let pairs = self
            .stock_reports
            .keys()
            .chain(self.abuse_reports.keys())
            .chain(self.favorites.keys());
        for (user_id, _) in pairs {
            users.entry(user_id.clone()).or_insert_with(|| UserSummary::new(user_id.as_str()));
        }
        for comment in &self.comments {
            users
                .entry(comment.user_id.clone())
                .or_insert_with(|| UserSummary::new(comment.user_id.as_str()));
        }
        for profile in self.profiles.values() {
            users
                .entry(profile.user_id.clone())
                .or_insert_with(|| UserSummary::new(profile.user_id.as_str()))
                .location = profile.location.clone();
        }
        for owner in self.offers.values().filter_map(|o| o.owner_id.as_deref()) {
            users
                .entry(owner.to_string())
                .or_insert_with(|| UserSummary::new(owner))
                .offer_count += 1;
        }
        users
    }

    /// Moves the offer to `next` if it differs; returns whether it moved
    fn set_status(&mut self, offer_id: Uuid, next: OfferStatus) -> Result<bool, LedgerError> {
        let offer = self.offer_mut(offer_id)?;
        if offer.status == next {
            return Ok(false);
        }
        offer.status = next;
        offer.updated_at = Utc::now();
        Ok(true)
    }
}

#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    tables: Mutex<Tables>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn offer_count(&self) -> usize {
        self.tables.lock().await.offers.len()
    }

    pub async fn abuse_report_count(&self, offer_id: Uuid) -> u64 {
        self.tables.lock().await.abuse_reports(offer_id)
    }

    pub async fn stock_report_count(&self, offer_id: Uuid) -> usize {
        self.tables
            .lock()
            .await
            .stock_reports
            .values()
            .filter(|r| r.offer_id == offer_id)
            .count()
    }

    pub async fn favorite_count(&self, offer_id: Uuid) -> usize {
        self.tables
            .lock()
            .await
            .favorites
            .values()
            .filter(|f| f.offer_id == offer_id)
            .count()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn insert_offer(&self, offer: NewOffer) -> Result<Offer, LedgerError> {
        let now = Utc::now();
        let record = Offer {
            id: Uuid::new_v4(),
            title: offer.title,
            price: offer.price,
            status: OfferStatus::Active,
            votes_count: 0,
            owner_id: offer.owner_id,
            store: offer.store,
            category: offer.category,
            category_slug: offer.category_slug,
            link: offer.link,
            image_url: offer.image_url,
            payment_methods: offer.payment_methods,
            created_at: now,
            updated_at: now,
        };

        let mut tables = self.tables.lock().await;
        tables.offers.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_offer(&self, offer_id: Uuid) -> Result<Option<Offer>, LedgerError> {
        Ok(self.tables.lock().await.offers.get(&offer_id).cloned())
    }

    async fn list_offers(&self, filter: &OfferFilter) -> Result<Vec<Offer>, LedgerError> {
        let tables = self.tables.lock().await;
        let mut offers: Vec<Offer> = tables
            .offers
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        offers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        offers.truncate(filter.effective_limit() as usize);
        Ok(offers)
    }

    async fn update_offer(&self, offer_id: Uuid, edit: &OfferEdit) -> Result<Offer, LedgerError> {
        let mut tables = self.tables.lock().await;
        let offer = tables.offer_mut(offer_id)?;
        offer.title = edit.title.trim().to_string();
        offer.price = edit.price;
        offer.store = edit.store.trim().to_string();
        offer.category = edit.category.trim().to_string();
        offer.category_slug = edit.category_slug();
        offer.link = edit.normalized_link();
        offer.updated_at = Utc::now();
        Ok(offer.clone())
    }

    async fn delete_offer(&self, offer_id: Uuid) -> Result<(), LedgerError> {
        let mut tables = self.tables.lock().await;
        if !tables.remove_offer(offer_id) {
            return Err(LedgerError::offer_not_found(offer_id));
        }
        Ok(())
    }

    async fn increment_votes(&self, offer_id: Uuid) -> Result<i64, LedgerError> {
        let mut tables = self.tables.lock().await;
        let offer = tables.offer_mut(offer_id)?;
        offer.votes_count += 1;
        Ok(offer.votes_count)
    }

    async fn override_status(&self, offer_id: Uuid, target: OfferStatus) -> Result<Offer, LedgerError> {
        let mut tables = self.tables.lock().await;
        let offer = tables.offer_mut(offer_id)?;
        let next = offer
            .status
            .transition(TransitionCause::ManualOverride(target))?;
        if offer.status != next {
            offer.status = next;
            offer.updated_at = Utc::now();
        }
        Ok(offer.clone())
    }

    async fn record_stock_report(
        &self,
        user_id: &str,
        offer_id: Uuid,
        status: StockStatus,
        thresholds: &ModerationThresholds,
    ) -> Result<StockReportOutcome, LedgerError> {
        let mut tables = self.tables.lock().await;
        tables.ensure_offer(offer_id)?;

        tables.stock_reports.insert(
            (user_id.to_string(), offer_id),
            StockReport {
                user_id: user_id.to_string(),
                offer_id,
                status,
                updated_at: Utc::now(),
            },
        );

        let negative_reports = tables.negative_reports(offer_id);
        let current = tables.offer_mut(offer_id)?.status;
        let mut transitioned = false;
        if status == StockStatus::No {
            let next = thresholds.status_after_stock_reports(current, negative_reports);
            transitioned = tables.set_status(offer_id, next)?;
        }

        Ok(StockReportOutcome {
            status,
            negative_reports,
            offer_status: tables.offer_mut(offer_id)?.status,
            transitioned,
        })
    }

    async fn stock_summary(&self, offer_id: Uuid) -> Result<StockSummary, LedgerError> {
        let tables = self.tables.lock().await;
        tables.ensure_offer(offer_id)?;
        let mut summary = StockSummary::default();
        for report in tables.stock_reports.values().filter(|r| r.offer_id == offer_id) {
            summary.record(report.status);
        }
        Ok(summary)
    }

    async fn record_abuse_report(
        &self,
        user_id: &str,
        offer_id: Uuid,
        reason: &str,
        thresholds: &ModerationThresholds,
    ) -> Result<ReportOutcome, LedgerError> {
        let mut tables = self.tables.lock().await;
        tables.ensure_offer(offer_id)?;

        let key = (user_id.to_string(), offer_id);
        if tables.abuse_reports.contains_key(&key) {
            return Err(LedgerError::DuplicateReport);
        }
        tables.abuse_reports.insert(
            key,
            AbuseReport {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                offer_id,
                reason: reason.to_string(),
                created_at: Utc::now(),
            },
        );

        let total_reports = tables.abuse_reports(offer_id);
        let current = tables.offer_mut(offer_id)?.status;
        let next = thresholds.status_after_abuse_reports(current, total_reports);
        let transitioned = tables.set_status(offer_id, next)?;

        Ok(ReportOutcome {
            total_reports,
            offer_status: next,
            transitioned,
        })
    }

    async fn toggle_favorite(&self, user_id: &str, offer_id: Uuid) -> Result<FavoriteToggle, LedgerError> {
        let mut tables = self.tables.lock().await;
        tables.ensure_offer(offer_id)?;

        let key = (user_id.to_string(), offer_id);
        if tables.favorites.remove(&key).is_some() {
            return Ok(FavoriteToggle { added: false });
        }
        tables.favorites.insert(
            key,
            Favorite {
                user_id: user_id.to_string(),
                offer_id,
                created_at: Utc::now(),
            },
        );
        Ok(FavoriteToggle { added: true })
    }

    async fn list_favorites(&self, user_id: &str) -> Result<Vec<Offer>, LedgerError> {
        let tables = self.tables.lock().await;
        let mut favorites: Vec<&Favorite> = tables
            .favorites
            .values()
            .filter(|f| f.user_id == user_id)
            .collect();
        favorites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(favorites
            .into_iter()
            .filter_map(|f| tables.offers.get(&f.offer_id).cloned())
            .collect())
    }

    async fn insert_comment(&self, user_id: &str, offer_id: Uuid, text: &str) -> Result<Comment, LedgerError> {
        let mut tables = self.tables.lock().await;
        tables.ensure_offer(offer_id)?;
        let comment = Comment {
            id: Uuid::new_v4(),
            offer_id,
            user_id: user_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, offer_id: Uuid) -> Result<Vec<Comment>, LedgerError> {
        let tables = self.tables.lock().await;
        tables.ensure_offer(offer_id)?;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.offer_id == offer_id)
            .cloned()
            .collect())
    }

    async fn upsert_profile(&self, user_id: &str, location: Option<&str>) -> Result<UserProfile, LedgerError> {
        let mut tables = self.tables.lock().await;
        let profile = UserProfile {
            user_id: user_id.to_string(),
            location: location.map(str::to_string),
            updated_at: Utc::now(),
        };
        tables.profiles.insert(user_id.to_string(), profile.clone());
        Ok(profile)
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, LedgerError> {
        Ok(self.tables.lock().await.known_users().into_values().collect())
    }

    async fn delete_user(&self, user_id: &str) -> Result<Vec<Uuid>, LedgerError> {
        let mut tables = self.tables.lock().await;
        if !tables.known_users().contains_key(user_id) {
            return Err(LedgerError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            });
        }

        let owned: Vec<Uuid> = tables
            .offers
            .values()
            .filter(|o| o.owner_id.as_deref() == Some(user_id))
            .map(|o| o.id)
            .collect();
        for offer_id in &owned {
            tables.remove_offer(*offer_id);
        }

        tables.stock_reports.retain(|(user, _), _| user != user_id);
        tables.abuse_reports.retain(|(user, _), _| user != user_id);
        tables.favorites.retain(|(user, _), _| user != user_id);
        tables.comments.retain(|c| c.user_id != user_id);
        tables.profiles.remove(user_id);
        tables
            .subscriptions
            .retain(|_, s| s.user_id.as_deref() != Some(user_id));
        Ok(owned)
    }

    async fn board_stats(&self) -> Result<BoardStats, LedgerError> {
        let tables = self.tables.lock().await;
        let mut stats = BoardStats {
            users: tables.known_users().len() as u64,
            offers: tables.offers.len() as u64,
            ..Default::default()
        };
        for offer in tables.offers.values() {
            match offer.status {
                OfferStatus::Active => stats.active_offers += 1,
                OfferStatus::Expired => stats.expired_offers += 1,
                OfferStatus::Rejected => stats.rejected_offers += 1,
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl SubscriptionStore for MemoryLedgerStore {
    async fn upsert_subscription(
        &self,
        subscription: &NewSubscription,
        user_id: Option<&str>,
    ) -> Result<PushSubscription, LedgerError> {
        let mut tables = self.tables.lock().await;
        let entry = tables
            .subscriptions
            .entry(subscription.endpoint.clone())
            .or_insert_with(|| PushSubscription {
                id: Uuid::new_v4(),
                endpoint: subscription.endpoint.clone(),
                p256dh: String::new(),
                auth: String::new(),
                user_id: None,
                created_at: Utc::now(),
            });
        entry.p256dh = subscription.keys.p256dh.clone();
        entry.auth = subscription.keys.auth.clone();
        if let Some(user_id) = user_id {
            entry.user_id = Some(user_id.to_string());
        }
        Ok(entry.clone())
    }

    async fn list_subscriptions(&self) -> Result<Vec<PushSubscription>, LedgerError> {
        let tables = self.tables.lock().await;
        let mut subscriptions: Vec<PushSubscription> = tables.subscriptions.values().cloned().collect();
        subscriptions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(subscriptions)
    }

    async fn delete_subscription(&self, subscription_id: Uuid) -> Result<bool, LedgerError> {
        let mut tables = self.tables.lock().await;
        let before = tables.subscriptions.len();
        tables.subscriptions.retain(|_, s| s.id != subscription_id);
        Ok(tables.subscriptions.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OfferDraft, SubscriptionKeys};

    async fn seeded() -> (MemoryLedgerStore, Uuid) {
        let store = MemoryLedgerStore::new();
        let offer = OfferDraft {
            title: Some("Freidora de aire".to_string()),
            price: Some(89_999.0),
            ..Default::default()
        }
        .into_new_offer(Some("ana".to_string()))
        .unwrap();
        let id = store.insert_offer(offer).await.unwrap().id;
        (store, id)
    }

    #[tokio::test]
    async fn test_stock_report_upsert_keeps_one_row() {
        let (store, id) = seeded().await;
        let thresholds = ModerationThresholds::default();

        store.record_stock_report("luis", id, StockStatus::Yes, &thresholds).await.unwrap();
        let outcome = store.record_stock_report("luis", id, StockStatus::No, &thresholds).await.unwrap();

        assert_eq!(store.stock_report_count(id).await, 1);
        assert_eq!(outcome.negative_reports, 1);
        assert_eq!(outcome.offer_status, OfferStatus::Active);
    }

    #[tokio::test]
    async fn test_missing_offer() {
        let store = MemoryLedgerStore::new();
        let missing = Uuid::new_v4();
        assert!(matches!(
            store.increment_votes(missing).await,
            Err(LedgerError::NotFound { .. })
        ));
        assert!(matches!(
            store.toggle_favorite("ana", missing).await,
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (store, id) = seeded().await;
        let thresholds = ModerationThresholds::default();
        store.toggle_favorite("luis", id).await.unwrap();
        store.record_abuse_report("luis", id, "precio falso", &thresholds).await.unwrap();
        store.insert_comment("luis", id, "buenísimo").await.unwrap();

        store.delete_offer(id).await.unwrap();

        assert_eq!(store.offer_count().await, 0);
        assert_eq!(store.favorite_count(id).await, 0);
        assert_eq!(store.abuse_report_count(id).await, 0);
        assert!(store.list_favorites("luis").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_user_removes_their_traces() {
        let (store, anas_offer) = seeded().await;
        let thresholds = ModerationThresholds::default();
        let luis_offer = store
            .insert_offer(
                OfferDraft {
                    title: Some("Café 500g".to_string()),
                    ..Default::default()
                }
                .into_new_offer(Some("luis".to_string()))
                .unwrap(),
            )
            .await
            .unwrap()
            .id;
        store.toggle_favorite("luis", anas_offer).await.unwrap();
        store.record_abuse_report("luis", anas_offer, "spam", &thresholds).await.unwrap();
        store.record_stock_report("ana", luis_offer, StockStatus::No, &thresholds).await.unwrap();
        store.upsert_profile("ana", Some("Córdoba")).await.unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(
            users.iter().map(|u| u.user_id.as_str()).collect::<Vec<_>>(),
            ["ana", "luis"]
        );
        assert_eq!(users[0].location.as_deref(), Some("Córdoba"));
        assert_eq!(users[0].offer_count, 1);

        let removed = store.delete_user("ana").await.unwrap();
        assert_eq!(removed, vec![anas_offer]);
        assert!(store.get_offer(anas_offer).await.unwrap().is_none());
        assert_eq!(store.stock_report_count(luis_offer).await, 0);
        assert!(store.list_favorites("luis").await.unwrap().is_empty());
        assert_eq!(store.list_users().await.unwrap().len(), 1);

        assert!(matches!(
            store.delete_user("ana").await,
            Err(LedgerError::NotFound { entity: "user", .. })
        ));
    }

    #[tokio::test]
    async fn test_board_stats() {
        let (store, id) = seeded().await;
        assert_eq!(store.board_stats().await.unwrap().active_offers, 1);

        store.override_status(id, OfferStatus::Expired).await.unwrap();
        store.upsert_profile("luis", None).await.unwrap();
        let stats = store.board_stats().await.unwrap();
        assert_eq!(
            stats,
            BoardStats {
                users: 2,
                offers: 1,
                active_offers: 0,
                expired_offers: 1,
                rejected_offers: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_subscription_upsert_by_endpoint() {
        let store = MemoryLedgerStore::new();
        let sub = NewSubscription {
            endpoint: "https://push.example/abc".to_string(),
            keys: SubscriptionKeys {
                p256dh: "k1".to_string(),
                auth: "a1".to_string(),
            },
        };
        let first = store.upsert_subscription(&sub, None).await.unwrap();
        let mut again = sub.clone();
        again.keys.p256dh = "k2".to_string();
        let second = store.upsert_subscription(&again, Some("ana")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.p256dh, "k2");
        assert_eq!(store.list_subscriptions().await.unwrap().len(), 1);
        assert!(store.delete_subscription(first.id).await.unwrap());
        assert!(!store.delete_subscription(first.id).await.unwrap());
    }
}
