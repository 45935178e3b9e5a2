//! Engagement Repository - stock reports, abuse reports, favorites, comments and profiles

use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::offers::{OFFER_SELECT, ensure_offer_exists, lock_offer_status, offer_from_row, set_offer_status};
use crate::error::LedgerError;
use crate::ledger::ModerationThresholds;
use crate::models::{
    Comment, FavoriteToggle, Offer, ReportOutcome, StockReportOutcome, StockStatus, StockSummary, UserProfile,
};

pub struct EngagementRepository {
    pool: PgPool,
}

impl EngagementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert the caller's stock report and apply the expiry rule under the offer row lock
    pub async fn record_stock_report(
        &self,
        user_id: &str,
        offer_id: Uuid,
        status: StockStatus,
        thresholds: &ModerationThresholds,
    ) -> Result<StockReportOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let current = lock_offer_status(&mut tx, offer_id).await?;

        sqlx::query(
            r#"
            INSERT INTO deals.stock_reports (user_id, offer_id, status, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id, offer_id)
            DO UPDATE SET status = EXCLUDED.status, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(offer_id)
        .bind(status.as_str())
        .execute(&mut *tx)
        .await?;

        let negative: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM deals.stock_reports WHERE offer_id = $1 AND status = 'NO'",
        )
        .bind(offer_id)
        .fetch_one(&mut *tx)
        .await?;
        let negative_reports = negative.max(0) as u64;

        let mut offer_status = current;
        let mut transitioned = false;
        if status == StockStatus::No {
            let next = thresholds.status_after_stock_reports(current, negative_reports);
            if next != current {
                set_offer_status(&mut tx, offer_id, next).await?;
                offer_status = next;
                transitioned = true;
            }
        }

        tx.commit().await?;

        if transitioned {
            info!(offer_id = %offer_id, negative_reports, "Offer expired by stock reports");
        }

        Ok(StockReportOutcome {
            status,
            negative_reports,
            offer_status,
            transitioned,
        })
    }

    pub async fn stock_summary(&self, offer_id: Uuid) -> Result<StockSummary, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ensure_offer_exists(&mut conn, offer_id).await?;

        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS reports FROM deals.stock_reports WHERE offer_id = $1 GROUP BY status",
        )
        .bind(offer_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut summary = StockSummary::default();
        for row in rows {
            let status: String = row.try_get("status")?;
            let reports: i64 = row.try_get("reports")?;
            match status.parse::<StockStatus>() {
                Ok(StockStatus::Yes) => summary.yes = reports.max(0) as u64,
                Ok(StockStatus::No) => summary.no = reports.max(0) as u64,
                Err(_) => debug!(status = %status, "Skipping unknown stock status"),
            }
        }
        Ok(summary)
    }

    /// One report per user and offer; a second attempt is `DuplicateReport`
    pub async fn record_abuse_report(
        &self,
        user_id: &str,
        offer_id: Uuid,
        reason: &str,
        thresholds: &ModerationThresholds,
    ) -> Result<ReportOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let current = lock_offer_status(&mut tx, offer_id).await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO deals.reports (id, user_id, offer_id, reason)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, offer_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(offer_id)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(LedgerError::DuplicateReport);
        }

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM deals.reports WHERE offer_id = $1")
            .bind(offer_id)
            .fetch_one(&mut *tx)
            .await?;
        let total_reports = total.max(0) as u64;

        let next = thresholds.status_after_abuse_reports(current, total_reports);
        let transitioned = next != current;
        if transitioned {
            set_offer_status(&mut tx, offer_id, next).await?;
        }

        tx.commit().await?;

        if transitioned {
            info!(offer_id = %offer_id, total_reports, "Offer rejected by abuse reports");
        }

        Ok(ReportOutcome {
            total_reports,
            offer_status: next,
            transitioned,
        })
    }

    pub async fn toggle_favorite(&self, user_id: &str, offer_id: Uuid) -> Result<FavoriteToggle, LedgerError> {
        let mut tx = self.pool.begin().await?;
        ensure_offer_exists(&mut tx, offer_id).await?;

        let removed = sqlx::query("DELETE FROM deals.favorites WHERE user_id = $1 AND offer_id = $2")
            .bind(user_id)
            .bind(offer_id)
            .execute(&mut *tx)
            .await?;

        let added = if removed.rows_affected() > 0 {
            false
        } else {
            sqlx::query(
                r#"
                INSERT INTO deals.favorites (user_id, offer_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(offer_id)
            .execute(&mut *tx)
            .await?;
            true
        };

        tx.commit().await?;
        Ok(FavoriteToggle { added })
    }

    pub async fn list_favorites(&self, user_id: &str) -> Result<Vec<Offer>, LedgerError> {
        let query = format!(
            r#"{}
            JOIN deals.favorites f ON f.offer_id = o.id
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC
            "#,
            OFFER_SELECT
        );

        let rows = sqlx::query(&query).bind(user_id).fetch_all(&self.pool).await?;
        rows.iter().map(offer_from_row).collect()
    }

    pub async fn insert_comment(&self, user_id: &str, offer_id: Uuid, text: &str) -> Result<Comment, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ensure_offer_exists(&mut conn, offer_id).await?;

        let row = sqlx::query(
            r#"
            INSERT INTO deals.comments (id, offer_id, user_id, text)
            VALUES ($1, $2, $3, $4)
            RETURNING id, offer_id, user_id, text, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(offer_id)
        .bind(user_id)
        .bind(text)
        .fetch_one(&mut *conn)
        .await?;

        Ok(Comment {
            id: row.try_get("id")?,
            offer_id: row.try_get("offer_id")?,
            user_id: row.try_get("user_id")?,
            text: row.try_get("text")?,
            created_at: row.try_get("created_at")?,
        })
    }

    pub async fn list_comments(&self, offer_id: Uuid) -> Result<Vec<Comment>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ensure_offer_exists(&mut conn, offer_id).await?;

        let rows = sqlx::query(
            r#"
            SELECT id, offer_id, user_id, text, created_at
            FROM deals.comments
            WHERE offer_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(offer_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Comment {
                    id: row.try_get("id")?,
                    offer_id: row.try_get("offer_id")?,
                    user_id: row.try_get("user_id")?,
                    text: row.try_get("text")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    pub async fn upsert_profile(&self, user_id: &str, location: Option<&str>) -> Result<UserProfile, LedgerError> {
        let row = sqlx::query(
            r#"
            INSERT INTO deals.profiles (user_id, location, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET location = EXCLUDED.location, updated_at = NOW()
            RETURNING user_id, location, updated_at
            "#,
        )
        .bind(user_id)
        .bind(location)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserProfile {
            user_id: row.try_get("user_id")?,
            location: row.try_get("location")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
