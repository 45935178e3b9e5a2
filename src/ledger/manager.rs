//! Moderation Ledger - Main Orchestrator
//!
//! Applies caller checks and input validation, delegates each operation to
//! the store as one atomic unit, then marks the affected views stale.

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{ViewInvalidator, NoopInvalidator, paths};
use crate::error::LedgerError;
use crate::ledger::policy::{AuthorizationPolicy, ensure_admin, ensure_owner_or_admin};
use crate::ledger::store::LedgerStore;
use crate::ledger::thresholds::ModerationThresholds;
use crate::models::{
    BanOutcome, BoardStats, Caller, Comment, FavoriteToggle, Offer, OfferDraft, OfferEdit, OfferFilter,
    OfferStatus, ReportOutcome, StockReportOutcome, StockStatus, StockSummary, UserProfile, UserSummary,
};

pub const MAX_COMMENT_LEN: usize = 2_000;
pub const MAX_REASON_LEN: usize = 500;

pub struct ModerationLedger {
    store: Arc<dyn LedgerStore>,
    policy: Arc<dyn AuthorizationPolicy>,
    views: Arc<dyn ViewInvalidator>,
    thresholds: ModerationThresholds,
}

impl ModerationLedger {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        policy: Arc<dyn AuthorizationPolicy>,
        thresholds: ModerationThresholds,
    ) -> Self {
        Self {
            store,
            policy,
            views: Arc::new(NoopInvalidator),
            thresholds,
        }
    }

    pub fn with_invalidator(mut self, views: Arc<dyn ViewInvalidator>) -> Self {
        self.views = views;
        self
    }

    pub fn thresholds(&self) -> &ModerationThresholds {
        &self.thresholds
    }

    pub fn policy(&self) -> &dyn AuthorizationPolicy {
        self.policy.as_ref()
    }

    pub fn backend_tag(&self) -> &'static str {
        self.store.backend_tag()
    }

    // Offers

    /// Anonymous callers may post; the offer then has no owner
    pub async fn create_offer(&self, caller: &Caller, draft: OfferDraft) -> Result<Offer, LedgerError> {
        let new_offer = draft.into_new_offer(caller.user_id().map(str::to_string))?;
        let offer = self.store.insert_offer(new_offer).await?;

        info!(
            offer_id = %offer.id,
            owner = ?offer.owner_id,
            store = %offer.store,
            "Offer created"
        );
        self.views.invalidate(paths::LISTING);
        Ok(offer)
    }

    pub async fn get_offer(&self, offer_id: Uuid) -> Result<Offer, LedgerError> {
        self.store
            .get_offer(offer_id)
            .await?
            .ok_or_else(|| LedgerError::offer_not_found(offer_id))
    }

    pub async fn list_offers(&self, filter: &OfferFilter) -> Result<Vec<Offer>, LedgerError> {
        self.store.list_offers(filter).await
    }

    pub async fn update_offer(
        &self,
        caller: &Caller,
        offer_id: Uuid,
        edit: OfferEdit,
    ) -> Result<Offer, LedgerError> {
        let user_id = caller.require_user()?;
        let offer = self.get_offer(offer_id).await?;
        ensure_owner_or_admin(self.policy(), caller, offer.owner_id.as_deref())?;
        edit.validate()?;

        let updated = self.store.update_offer(offer_id, &edit).await?;
        info!(offer_id = %offer_id, editor = %user_id, "Offer updated");
        self.touch_offer(offer_id);
        Ok(updated)
    }

    pub async fn delete_offer(&self, caller: &Caller, offer_id: Uuid) -> Result<(), LedgerError> {
        let user_id = caller.require_user()?;
        let offer = self.get_offer(offer_id).await?;
        ensure_owner_or_admin(self.policy(), caller, offer.owner_id.as_deref())?;

        self.store.delete_offer(offer_id).await?;
        info!(offer_id = %offer_id, deleted_by = %user_id, "Offer deleted");
        self.touch_offer(offer_id);
        Ok(())
    }

    // Engagement

    /// No per-user dedupe: every call adds exactly one vote
    pub async fn record_vote(&self, offer_id: Uuid) -> Result<i64, LedgerError> {
        let votes = self.store.increment_votes(offer_id).await?;
        debug!(offer_id = %offer_id, votes = votes, "Vote recorded");
        self.views.invalidate(paths::LISTING);
        Ok(votes)
    }

    pub async fn set_stock_report(
        &self,
        caller: &Caller,
        offer_id: Uuid,
        status: StockStatus,
    ) -> Result<StockReportOutcome, LedgerError> {
        let user_id = caller.require_user()?;
        let outcome = self
            .store
            .record_stock_report(user_id, offer_id, status, &self.thresholds)
            .await?;

        debug!(
            offer_id = %offer_id,
            user_id = %user_id,
            status = %status,
            negative_reports = outcome.negative_reports,
            "Stock report recorded"
        );
        if outcome.transitioned {
            info!(
                offer_id = %offer_id,
                negative_reports = outcome.negative_reports,
                threshold = self.thresholds.stock_expiry_threshold,
                "Offer expired by negative stock reports"
            );
        }
        self.touch_offer(offer_id);
        Ok(outcome)
    }

    pub async fn stock_summary(&self, offer_id: Uuid) -> Result<StockSummary, LedgerError> {
        self.store.stock_summary(offer_id).await
    }

    pub async fn toggle_favorite(&self, caller: &Caller, offer_id: Uuid) -> Result<FavoriteToggle, LedgerError> {
        let user_id = caller.require_user()?;
        let toggle = self.store.toggle_favorite(user_id, offer_id).await?;

        debug!(offer_id = %offer_id, user_id = %user_id, added = toggle.added, "Favorite toggled");
        self.touch_offer(offer_id);
        self.views.invalidate(paths::PROFILE);
        Ok(toggle)
    }

    pub async fn list_favorites(&self, caller: &Caller) -> Result<Vec<Offer>, LedgerError> {
        let user_id = caller.require_user()?;
        self.store.list_favorites(user_id).await
    }

    /// A second report by the same user fails with `DuplicateReport`
    pub async fn file_report(
        &self,
        caller: &Caller,
        offer_id: Uuid,
        reason: &str,
    ) -> Result<ReportOutcome, LedgerError> {
        let user_id = caller.require_user()?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::Validation("report reason is required".to_string()));
        }
        if reason.chars().count() > MAX_REASON_LEN {
            return Err(LedgerError::Validation(format!(
                "report reason exceeds {} characters",
                MAX_REASON_LEN
            )));
        }

        let outcome = match self
            .store
            .record_abuse_report(user_id, offer_id, reason, &self.thresholds)
            .await
        {
            Ok(outcome) => outcome,
            Err(LedgerError::DuplicateReport) => {
                debug!(offer_id = %offer_id, user_id = %user_id, "Duplicate abuse report");
                return Err(LedgerError::DuplicateReport);
            }
            Err(e) => return Err(e),
        };

        info!(
            offer_id = %offer_id,
            total_reports = outcome.total_reports,
            "Abuse report filed"
        );
        if outcome.transitioned {
            warn!(
                offer_id = %offer_id,
                total_reports = outcome.total_reports,
                threshold = self.thresholds.abuse_rejection_threshold,
                "Offer rejected by abuse reports"
            );
        }
        self.touch_offer(offer_id);
        Ok(outcome)
    }

    /// Owner/admin override between active and expired
    pub async fn set_offer_stock(
        &self,
        caller: &Caller,
        offer_id: Uuid,
        new_status: OfferStatus,
    ) -> Result<Offer, LedgerError> {
        let user_id = caller.require_user()?;
        let offer = self.get_offer(offer_id).await?;
        ensure_owner_or_admin(self.policy(), caller, offer.owner_id.as_deref())?;

        let updated = self.store.override_status(offer_id, new_status).await?;
        info!(
            offer_id = %offer_id,
            actor = %user_id,
            from = %offer.status,
            to = %updated.status,
            "Offer status overridden"
        );
        self.touch_offer(offer_id);
        Ok(updated)
    }

    // Comments and profile

    pub async fn add_comment(&self, caller: &Caller, offer_id: Uuid, text: &str) -> Result<Comment, LedgerError> {
        let user_id = caller.require_user()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(LedgerError::Validation("comment text is required".to_string()));
        }
        if text.chars().count() > MAX_COMMENT_LEN {
            return Err(LedgerError::Validation(format!(
                "comment exceeds {} characters",
                MAX_COMMENT_LEN
            )));
        }

        let comment = self.store.insert_comment(user_id, offer_id, text).await?;
        debug!(offer_id = %offer_id, comment_id = %comment.id, "Comment added");
        self.views.invalidate(&paths::offer_detail(offer_id));
        Ok(comment)
    }

    pub async fn list_comments(&self, offer_id: Uuid) -> Result<Vec<Comment>, LedgerError> {
        self.store.list_comments(offer_id).await
    }

    pub async fn update_location(&self, caller: &Caller, location: Option<&str>) -> Result<UserProfile, LedgerError> {
        let user_id = caller.require_user()?;
        let location = location.map(str::trim).filter(|l| !l.is_empty());
        let profile = self.store.upsert_profile(user_id, location).await?;

        self.views.invalidate(paths::SETTINGS);
        self.views.invalidate(paths::PROFILE);
        Ok(profile)
    }

    // User moderation

    pub async fn list_users(&self, caller: &Caller) -> Result<Vec<UserSummary>, LedgerError> {
        ensure_admin(self.policy(), caller)?;
        let mut users = self.store.list_users().await?;
        for user in &mut users {
            user.is_admin = self.policy.is_admin(&user.user_id);
        }
        Ok(users)
    }

    /// Removes the user together with every offer they published.
    /// Admin identities cannot be banned.
    pub async fn ban_user(&self, caller: &Caller, target: &str) -> Result<BanOutcome, LedgerError> {
        let admin = ensure_admin(self.policy(), caller)?;
        let target = target.trim();
        if target.is_empty() {
            return Err(LedgerError::Validation("user id is required".to_string()));
        }
        if self.policy.is_admin(target) {
            warn!(admin = %admin, "Refused to ban an admin identity");
            return Err(LedgerError::Forbidden("admins cannot be banned".to_string()));
        }

        let removed_offers = self.store.delete_user(target).await?;
        info!(
            admin = %admin,
            user = %target,
            removed_offers = removed_offers.len(),
            "User banned"
        );

        for offer_id in &removed_offers {
            self.views.invalidate(&paths::offer_detail(*offer_id));
        }
        self.views.invalidate(paths::LISTING);
        self.views.invalidate(paths::PROFILE);
        self.views.invalidate(paths::ADMIN_USERS);
        Ok(BanOutcome {
            user_id: target.to_string(),
            removed_offers,
        })
    }

    pub async fn stats(&self, caller: &Caller) -> Result<BoardStats, LedgerError> {
        ensure_admin(self.policy(), caller)?;
        self.store.board_stats().await
    }

    fn touch_offer(&self, offer_id: Uuid) {
        self.views.invalidate(paths::LISTING);
        self.views.invalidate(&paths::offer_detail(offer_id));
    }
}
