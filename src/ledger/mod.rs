//! Moderation and Engagement Ledger
//!
//! Tracks votes, favorites, stock reports and abuse reports per offer and
//! applies the threshold rules that move an offer's status.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────┐     ┌─────────────────────┐
//! │ AuthorizationPolicy  │────►│ ModerationLedger │◄────│ ModerationThresholds│
//! │ (owner/admin checks) │     │ (orchestrator)   │     │ (expiry, rejection) │
//! └──────────────────────┘     └──────────────────┘     └─────────────────────┘
//!                                  │          │
//!                                  ▼          ▼
//!                        ┌──────────────┐  ┌──────────────────┐
//!                        │ LedgerStore  │  │ ViewInvalidator  │
//!                        │ (pg / memory)│  │ (stale pages)    │
//!                        └──────────────┘  └──────────────────┘
//! ```

mod manager;
pub mod memory;
pub mod policy;
pub mod store;
mod thresholds;

pub use manager::{MAX_COMMENT_LEN, MAX_REASON_LEN, ModerationLedger};
pub use memory::MemoryLedgerStore;
pub use policy::{AllowListPolicy, AuthorizationPolicy, ensure_admin, ensure_owner_or_admin};
pub use store::{LedgerStore, SubscriptionStore};
pub use thresholds::ModerationThresholds;
