//! Database Connection Pool using sqlx

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::database::engagement::EngagementRepository;
use crate::database::offers::OfferRepository;
use crate::database::subscriptions::SubscriptionRepository;
use crate::database::users::UserRepository;
use crate::error::LedgerError;

const SCHEMA_STATEMENTS: &[(&str, &str)] = &[
    ("deals schema", "CREATE SCHEMA IF NOT EXISTS deals"),
    (
        "stores table",
        r#"
        CREATE TABLE IF NOT EXISTS deals.stores (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    ),
    (
        "categories table",
        r#"
        CREATE TABLE IF NOT EXISTS deals.categories (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE
        )
        "#,
    ),
    (
        "payment_methods table",
        r#"
        CREATE TABLE IF NOT EXISTS deals.payment_methods (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            slug TEXT NOT NULL
        )
        "#,
    ),
    (
        "offers table",
        r#"
        CREATE TABLE IF NOT EXISTS deals.offers (
            id UUID PRIMARY KEY,
            title TEXT NOT NULL,
            price DOUBLE PRECISION NOT NULL CHECK (price >= 0),
            status VARCHAR(16) NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'expired', 'rejected')),
            votes_count BIGINT NOT NULL DEFAULT 0 CHECK (votes_count >= 0),
            owner_id VARCHAR(255),
            store_id INTEGER NOT NULL REFERENCES deals.stores(id),
            category_id INTEGER NOT NULL REFERENCES deals.categories(id),
            link TEXT,
            image_url TEXT,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "offer_payment_methods table",
        r#"
        CREATE TABLE IF NOT EXISTS deals.offer_payment_methods (
            offer_id UUID NOT NULL REFERENCES deals.offers(id) ON DELETE CASCADE,
            payment_method_id INTEGER NOT NULL REFERENCES deals.payment_methods(id),
            PRIMARY KEY (offer_id, payment_method_id)
        )
        "#,
    ),
    (
        "stock_reports table",
        r#"
        CREATE TABLE IF NOT EXISTS deals.stock_reports (
            user_id VARCHAR(255) NOT NULL,
            offer_id UUID NOT NULL REFERENCES deals.offers(id) ON DELETE CASCADE,
            status VARCHAR(3) NOT NULL CHECK (status IN ('YES', 'NO')),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            PRIMARY KEY (user_id, offer_id)
        )
        "#,
    ),
    (
        "reports table",
        r#"
        CREATE TABLE IF NOT EXISTS deals.reports (
            id UUID PRIMARY KEY,
            user_id VARCHAR(255) NOT NULL,
            offer_id UUID NOT NULL REFERENCES deals.offers(id) ON DELETE CASCADE,
            reason TEXT NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            UNIQUE (user_id, offer_id)
        )
        "#,
    ),
    (
        "favorites table",
        r#"
        CREATE TABLE IF NOT EXISTS deals.favorites (
            user_id VARCHAR(255) NOT NULL,
            offer_id UUID NOT NULL REFERENCES deals.offers(id) ON DELETE CASCADE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            PRIMARY KEY (user_id, offer_id)
        )
        "#,
    ),
    (
        "comments table",
        r#"
        CREATE TABLE IF NOT EXISTS deals.comments (
            id UUID PRIMARY KEY,
            offer_id UUID NOT NULL REFERENCES deals.offers(id) ON DELETE CASCADE,
            user_id VARCHAR(255) NOT NULL,
            text TEXT NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "profiles table",
        r#"
        CREATE TABLE IF NOT EXISTS deals.profiles (
            user_id VARCHAR(255) PRIMARY KEY,
            location TEXT,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "push_subscriptions table",
        r#"
        CREATE TABLE IF NOT EXISTS deals.push_subscriptions (
            id UUID PRIMARY KEY,
            endpoint TEXT NOT NULL UNIQUE,
            p256dh TEXT NOT NULL,
            auth TEXT NOT NULL,
            user_id VARCHAR(255),
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "offers status index",
        "CREATE INDEX IF NOT EXISTS idx_offers_status_created ON deals.offers(status, created_at DESC)",
    ),
    (
        "stock_reports offer index",
        "CREATE INDEX IF NOT EXISTS idx_stock_reports_offer ON deals.stock_reports(offer_id, status)",
    ),
    (
        "reports offer index",
        "CREATE INDEX IF NOT EXISTS idx_reports_offer ON deals.reports(offer_id)",
    ),
    (
        "offers owner index",
        "CREATE INDEX IF NOT EXISTS idx_offers_owner ON deals.offers(owner_id)",
    ),
    (
        "comments offer index",
        "CREATE INDEX IF NOT EXISTS idx_comments_offer ON deals.comments(offer_id, created_at)",
    ),
];

pub struct DatabasePool {
    pool: PgPool,
    offers: OfferRepository,
    engagement: EngagementRepository,
    subscriptions: SubscriptionRepository,
    users: UserRepository,
}

impl DatabasePool {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(connection_string)
            .await
            .map_err(|e| LedgerError::Storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        info!("Connected to PostgreSQL");

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        let offers = OfferRepository::new(pool.clone());
        let engagement = EngagementRepository::new(pool.clone());
        let subscriptions = SubscriptionRepository::new(pool.clone());
        let users = UserRepository::new(pool.clone());

        Self {
            pool,
            offers,
            engagement,
            subscriptions,
            users,
        }
    }

    pub async fn init_schema(&self) -> Result<(), LedgerError> {
        info!("Initializing database schema...");

        for &(name, statement) in SCHEMA_STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| LedgerError::Storage(format!("Failed to create {}: {}", name, e)))?;
        }

        info!("Database schema initialized");
        Ok(())
    }

    pub fn offers(&self) -> &OfferRepository {
        &self.offers
    }

    pub fn engagement(&self) -> &EngagementRepository {
        &self.engagement
    }

    pub fn subscriptions(&self) -> &SubscriptionRepository {
        &self.subscriptions
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
