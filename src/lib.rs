//! Dealboard
//!
//! Backend for a community deals marketplace: users publish offers, vote
//! on them, report stock and abuse, and the moderation ledger moves offers
//! between active, expired and rejected as reports accumulate.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs          - Crate root with re-exports
//! ├── main.rs         - Server entrypoint
//! ├── config.rs       - Environment configuration
//! ├── error.rs        - LedgerError
//! ├── cache.rs        - Stale view tracking
//! ├── models/         - Offers, engagement records, users, subscriptions
//! ├── ledger/         - Moderation and engagement ledger
//! │   ├── manager.rs    - Orchestrator (auth, validation, invalidation)
//! │   ├── thresholds.rs - Expiry and rejection rules
//! │   ├── policy.rs     - Admin/owner authorization
//! │   ├── store.rs      - Persistence traits
//! │   └── memory.rs     - In-memory store
//! ├── database/       - PostgreSQL store (sqlx)
//! ├── notify/         - Push subscriptions and alert broadcast
//! ├── client/         - API client and optimistic state
//! └── api/            - HTTP endpoints and middleware
//! ```

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod ledger;
pub mod models;
pub mod notify;

pub use cache::{NoopInvalidator, StaleView, StaleViewRegistry, ViewInvalidator};
pub use config::HubConfig;
pub use database::DatabasePool;
pub use error::LedgerError;
pub use ledger::{
    AllowListPolicy, AuthorizationPolicy, LedgerStore, MemoryLedgerStore, ModerationLedger,
    ModerationThresholds, SubscriptionStore,
};
pub use models::{
    BanOutcome, BoardStats, Caller, Comment, FavoriteToggle, Offer, OfferDraft, OfferEdit, OfferFilter, OfferStatus,
    ReportOutcome, StockReportOutcome, StockStatus, StockSummary, UserSummary,
};
pub use notify::{BroadcastReport, HttpPushTransport, NotificationService, PushTransport};

pub use api::{ApiState, create_router};
pub use client::{ApiClient, OptimisticCounter, OptimisticToggle, ReconcileError};
