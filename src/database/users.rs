//! User Repository - moderation views over everyone the board has seen

use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{BoardStats, UserSummary};

/// Every user id that appears anywhere on the board
const KNOWN_USERS: &str = r#"
    SELECT user_id FROM deals.profiles
    UNION SELECT owner_id FROM deals.offers WHERE owner_id IS NOT NULL
    UNION SELECT user_id FROM deals.stock_reports
    UNION SELECT user_id FROM deals.reports
    UNION SELECT user_id FROM deals.favorites
    UNION SELECT user_id FROM deals.comments
"#;

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<UserSummary>, LedgerError> {
        let query = format!(
            r#"
            WITH known (user_id) AS ({KNOWN_USERS})
            SELECT k.user_id, p.location,
                   (SELECT COUNT(*) FROM deals.offers o WHERE o.owner_id = k.user_id) AS offer_count
            FROM known k
            LEFT JOIN deals.profiles p ON p.user_id = k.user_id
            ORDER BY k.user_id
            "#
        );
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                let offer_count: i64 = row.try_get("offer_count")?;
                Ok(UserSummary {
                    user_id: row.try_get("user_id")?,
                    location: row.try_get("location")?,
                    offer_count: offer_count.max(0) as u64,
                    is_admin: false,
                })
            })
            .collect()
    }

    async fn is_known(tx: &mut Transaction<'_, Postgres>, user_id: &str) -> Result<bool, LedgerError> {
        let query = format!("SELECT EXISTS (SELECT 1 FROM ({KNOWN_USERS}) k WHERE k.user_id = $1)");
        let known: bool = sqlx::query_scalar(&query)
            .bind(user_id)
            .fetch_one(&mut **tx)
            .await?;
        Ok(known)
    }

    /// Owned offers go first; their reports, favorites and comments cascade
    pub async fn delete(&self, user_id: &str) -> Result<Vec<Uuid>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        if !Self::is_known(&mut tx, user_id).await? {
            return Err(LedgerError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            });
        }

        let removed: Vec<Uuid> = sqlx::query_scalar("DELETE FROM deals.offers WHERE owner_id = $1 RETURNING id")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;

        for statement in [
            "DELETE FROM deals.stock_reports WHERE user_id = $1",
            "DELETE FROM deals.reports WHERE user_id = $1",
            "DELETE FROM deals.favorites WHERE user_id = $1",
            "DELETE FROM deals.comments WHERE user_id = $1",
            "DELETE FROM deals.profiles WHERE user_id = $1",
            "DELETE FROM deals.push_subscriptions WHERE user_id = $1",
        ] {
            sqlx::query(statement).bind(user_id).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!(removed_offers = removed.len(), "User removed");
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<BoardStats, LedgerError> {
        let query = format!(
            r#"
            SELECT
                (SELECT COUNT(*) FROM ({KNOWN_USERS}) k) AS users,
                COUNT(o.id) AS offers,
                COUNT(o.id) FILTER (WHERE o.status = 'active') AS active_offers,
                COUNT(o.id) FILTER (WHERE o.status = 'expired') AS expired_offers,
                COUNT(o.id) FILTER (WHERE o.status = 'rejected') AS rejected_offers
            FROM deals.offers o
            "#
        );
        let row = sqlx::query(&query).fetch_one(&self.pool).await?;

        let count = |column: &str| -> Result<u64, LedgerError> {
            let value: i64 = row.try_get(column)?;
            Ok(value.max(0) as u64)
        };
        Ok(BoardStats {
            users: count("users")?,
            offers: count("offers")?,
            active_offers: count("active_offers")?,
            expired_offers: count("expired_offers")?,
            rejected_offers: count("rejected_offers")?,
        })
    }
}
