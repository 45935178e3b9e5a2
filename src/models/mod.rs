//! Domain records shared by the ledger, the stores and the API

pub mod engagement;
pub mod offer;
pub mod subscription;
pub mod user;

pub use engagement::{
    AbuseReport, Comment, Favorite, FavoriteToggle, ReportOutcome, StockReport,
    StockReportOutcome, StockStatus, StockSummary,
};
pub use offer::{
    NewOffer, Offer, OfferDraft, OfferEdit, OfferFilter, OfferStatus, TransitionCause, slugify,
};
pub use subscription::{NewSubscription, PushSubscription, SubscriptionKeys};
pub use user::{BanOutcome, BoardStats, Caller, UserProfile, UserSummary};
