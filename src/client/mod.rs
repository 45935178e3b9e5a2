//! Client-side helpers: an HTTP client for the API and optimistic state
//! that keeps local counters responsive while mutations are in flight.

pub mod api_client;
pub mod optimistic;

pub use api_client::{ApiClient, ApiClientConfig};
pub use optimistic::{
    OptimisticCounter, OptimisticStockTally, OptimisticToggle, ReconcileError, StockTally,
};
