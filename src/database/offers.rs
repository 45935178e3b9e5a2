//! Offer Repository - PostgreSQL operations for offers using sqlx

use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{NewOffer, Offer, OfferEdit, OfferFilter, OfferStatus, TransitionCause, slugify};

/// Offer columns joined with store, category and payment method names
pub(crate) const OFFER_SELECT: &str = r#"
    SELECT o.id, o.title, o.price, o.status, o.votes_count, o.owner_id,
           s.name AS store_name, c.name AS category_name, c.slug AS category_slug,
           o.link, o.image_url, o.created_at, o.updated_at,
           ARRAY(
               SELECT pm.name
               FROM deals.offer_payment_methods opm
               JOIN deals.payment_methods pm ON pm.id = opm.payment_method_id
               WHERE opm.offer_id = o.id
               ORDER BY pm.name
           ) AS payment_methods
    FROM deals.offers o
    JOIN deals.stores s ON s.id = o.store_id
    JOIN deals.categories c ON c.id = o.category_id
"#;

pub(crate) fn offer_from_row(row: &PgRow) -> Result<Offer, LedgerError> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<OfferStatus>()
        .map_err(|_| LedgerError::Storage(format!("corrupt offer status: {}", status)))?;

    Ok(Offer {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        price: row.try_get("price")?,
        status,
        votes_count: row.try_get("votes_count")?,
        owner_id: row.try_get("owner_id")?,
        store: row.try_get("store_name")?,
        category: row.try_get("category_name")?,
        category_slug: row.try_get("category_slug")?,
        link: row.try_get("link")?,
        image_url: row.try_get("image_url")?,
        payment_methods: row.try_get("payment_methods")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) async fn fetch_offer(conn: &mut PgConnection, offer_id: Uuid) -> Result<Option<Offer>, LedgerError> {
    let query = format!("{} WHERE o.id = $1", OFFER_SELECT);
    let row = sqlx::query(&query)
        .bind(offer_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(offer_from_row).transpose()
}

/// Lock the offer row for the rest of the transaction and read its status
pub(crate) async fn lock_offer_status(conn: &mut PgConnection, offer_id: Uuid) -> Result<OfferStatus, LedgerError> {
    let status: Option<String> = sqlx::query_scalar("SELECT status FROM deals.offers WHERE id = $1 FOR UPDATE")
        .bind(offer_id)
        .fetch_optional(&mut *conn)
        .await?;

    let status = status.ok_or_else(|| LedgerError::offer_not_found(offer_id))?;
    status
        .parse::<OfferStatus>()
        .map_err(|_| LedgerError::Storage(format!("corrupt offer status: {}", status)))
}

pub(crate) async fn set_offer_status(conn: &mut PgConnection, offer_id: Uuid, status: OfferStatus) -> Result<(), LedgerError> {
    sqlx::query("UPDATE deals.offers SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(offer_id)
        .bind(status.as_str())
        .execute(&mut *conn)
        .await?;

    debug!(offer_id = %offer_id, status = %status, "Offer status written");
    Ok(())
}

pub(crate) async fn ensure_offer_exists(conn: &mut PgConnection, offer_id: Uuid) -> Result<(), LedgerError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM deals.offers WHERE id = $1)")
        .bind(offer_id)
        .fetch_one(&mut *conn)
        .await?;

    if exists {
        Ok(())
    } else {
        Err(LedgerError::offer_not_found(offer_id))
    }
}

async fn upsert_store(conn: &mut PgConnection, name: &str) -> Result<i32, LedgerError> {
    let id = sqlx::query_scalar(
        r#"
        INSERT INTO deals.stores (name) VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

async fn upsert_category(conn: &mut PgConnection, name: &str, slug: &str) -> Result<i32, LedgerError> {
    let id = sqlx::query_scalar(
        r#"
        INSERT INTO deals.categories (name, slug) VALUES ($1, $2)
        ON CONFLICT (slug) DO UPDATE SET slug = EXCLUDED.slug
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(slug)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

async fn link_payment_method(conn: &mut PgConnection, offer_id: Uuid, name: &str) -> Result<(), LedgerError> {
    let method_id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO deals.payment_methods (name, slug) VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(slugify(name))
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO deals.offer_payment_methods (offer_id, payment_method_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(offer_id)
    .bind(method_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub struct OfferRepository {
    pool: PgPool,
}

impl OfferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, offer: NewOffer) -> Result<Offer, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let store_id = upsert_store(&mut tx, &offer.store).await?;
        let category_id = upsert_category(&mut tx, &offer.category, &offer.category_slug).await?;
        let offer_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO deals.offers
                (id, title, price, status, owner_id, store_id, category_id, link, image_url)
            VALUES ($1, $2, $3, 'active', $4, $5, $6, $7, $8)
            "#,
        )
        .bind(offer_id)
        .bind(&offer.title)
        .bind(offer.price)
        .bind(&offer.owner_id)
        .bind(store_id)
        .bind(category_id)
        .bind(&offer.link)
        .bind(&offer.image_url)
        .execute(&mut *tx)
        .await?;

        for method in &offer.payment_methods {
            link_payment_method(&mut tx, offer_id, method).await?;
        }

        let created = fetch_offer(&mut tx, offer_id)
            .await?
            .ok_or_else(|| LedgerError::offer_not_found(offer_id))?;
        tx.commit().await?;

        debug!(offer_id = %offer_id, "Offer inserted");
        Ok(created)
    }

    pub async fn get(&self, offer_id: Uuid) -> Result<Option<Offer>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        fetch_offer(&mut conn, offer_id).await
    }

    pub async fn list(&self, filter: &OfferFilter) -> Result<Vec<Offer>, LedgerError> {
        let query = format!(
            r#"{}
            WHERE ($1::text IS NULL OR o.status = $1)
              AND ($2::text IS NULL OR c.slug = $2)
              AND ($3::text IS NULL OR o.title ILIKE '%' || $3 || '%')
            ORDER BY o.created_at DESC
            LIMIT $4
            "#,
            OFFER_SELECT
        );

        let rows = sqlx::query(&query)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.category.as_deref())
            .bind(filter.q.as_deref())
            .bind(filter.effective_limit() as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(offer_from_row).collect()
    }

    pub async fn update(&self, offer_id: Uuid, edit: &OfferEdit) -> Result<Offer, LedgerError> {
        let mut tx = self.pool.begin().await?;
        lock_offer_status(&mut tx, offer_id).await?;

        let store_id = upsert_store(&mut tx, edit.store.trim()).await?;
        let category_id = upsert_category(&mut tx, edit.category.trim(), &edit.category_slug()).await?;

        sqlx::query(
            r#"
            UPDATE deals.offers
            SET title = $2, price = $3, link = $4, store_id = $5, category_id = $6, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(offer_id)
        .bind(edit.title.trim())
        .bind(edit.price)
        .bind(edit.normalized_link())
        .bind(store_id)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;

        let updated = fetch_offer(&mut tx, offer_id)
            .await?
            .ok_or_else(|| LedgerError::offer_not_found(offer_id))?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Dependent rows go with the offer through ON DELETE CASCADE
    pub async fn delete(&self, offer_id: Uuid) -> Result<(), LedgerError> {
        let result = sqlx::query("DELETE FROM deals.offers WHERE id = $1")
            .bind(offer_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::offer_not_found(offer_id));
        }
        Ok(())
    }

    pub async fn increment_votes(&self, offer_id: Uuid) -> Result<i64, LedgerError> {
        let votes: Option<i64> = sqlx::query_scalar(
            "UPDATE deals.offers SET votes_count = votes_count + 1 WHERE id = $1 RETURNING votes_count",
        )
        .bind(offer_id)
        .fetch_optional(&self.pool)
        .await?;

        votes.ok_or_else(|| LedgerError::offer_not_found(offer_id))
    }

    pub async fn override_status(&self, offer_id: Uuid, target: OfferStatus) -> Result<Offer, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let current = lock_offer_status(&mut tx, offer_id).await?;
        let next = current.transition(TransitionCause::ManualOverride(target))?;

        if next != current {
            set_offer_status(&mut tx, offer_id, next).await?;
        }

        let offer = fetch_offer(&mut tx, offer_id)
            .await?
            .ok_or_else(|| LedgerError::offer_not_found(offer_id))?;
        tx.commit().await?;
        Ok(offer)
    }
}
