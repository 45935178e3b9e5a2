//! Push subscription repository

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{NewSubscription, PushSubscription};

fn subscription_from_row(row: &PgRow) -> Result<PushSubscription, LedgerError> {
    Ok(PushSubscription {
        id: row.try_get("id")?,
        endpoint: row.try_get("endpoint")?,
        p256dh: row.try_get("p256dh")?,
        auth: row.try_get("auth")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
    })
}

pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Re-subscribing the same endpoint refreshes its keys and keeps any known user
    pub async fn upsert(
        &self,
        subscription: &NewSubscription,
        user_id: Option<&str>,
    ) -> Result<PushSubscription, LedgerError> {
        let row = sqlx::query(
            r#"
            INSERT INTO deals.push_subscriptions (id, endpoint, p256dh, auth, user_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (endpoint) DO UPDATE SET
                p256dh = EXCLUDED.p256dh,
                auth = EXCLUDED.auth,
                user_id = COALESCE(EXCLUDED.user_id, deals.push_subscriptions.user_id)
            RETURNING id, endpoint, p256dh, auth, user_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&subscription.endpoint)
        .bind(&subscription.keys.p256dh)
        .bind(&subscription.keys.auth)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        subscription_from_row(&row)
    }

    pub async fn list(&self) -> Result<Vec<PushSubscription>, LedgerError> {
        let rows = sqlx::query(
            "SELECT id, endpoint, p256dh, auth, user_id, created_at FROM deals.push_subscriptions ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(subscription_from_row).collect()
    }

    pub async fn delete(&self, subscription_id: Uuid) -> Result<bool, LedgerError> {
        let result = sqlx::query("DELETE FROM deals.push_subscriptions WHERE id = $1")
            .bind(subscription_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
