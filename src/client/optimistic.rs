//! Optimistic client state
//!
//! A value is updated locally before the server confirms the mutation.
//! On success it is reconciled to whatever the server returned; on failure
//! it is restored and the caller gets a `ReconcileError` to show the user.
//! Observers follow changes through a `watch` channel.

use std::fmt::Display;
use std::future::Future;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use crate::models::{StockStatus, StockSummary};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ReconcileError {
    /// User-facing text
    pub message: String,
    /// Underlying failure
    pub detail: String,
}

impl ReconcileError {
    fn from_failure(message: &str, err: impl Display) -> Self {
        Self {
            message: message.to_string(),
            detail: err.to_string(),
        }
    }
}

/// Vote-style counter
pub struct OptimisticCounter {
    value: watch::Sender<i64>,
    /// Serializes apply calls so a rollback never clobbers a newer delta
    in_flight: Mutex<()>,
    failure_message: String,
}

impl OptimisticCounter {
    pub fn new(initial: i64) -> Self {
        let (value, _) = watch::channel(initial);
        Self {
            value,
            in_flight: Mutex::new(()),
            failure_message: "No se pudo registrar el voto".to_string(),
        }
    }

    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }

    pub fn get(&self) -> i64 {
        *self.value.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<i64> {
        self.value.subscribe()
    }

    /// Apply `delta` now, then run `mutation`. A server value in the
    /// successful result replaces the local one.
    pub async fn apply<F, Fut, E>(&self, delta: i64, mutation: F) -> Result<i64, ReconcileError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<i64>, E>>,
        E: Display,
    {
        let _guard = self.in_flight.lock().await;
        let previous = self.get();
        self.value.send_replace(previous.saturating_add(delta));

        match mutation().await {
            Ok(Some(server_value)) => {
                debug!(previous, server_value, "Counter reconciled with server");
                self.value.send_replace(server_value);
                Ok(server_value)
            }
            Ok(None) => Ok(self.get()),
            Err(e) => {
                warn!(previous, error = %e, "Mutation failed; rolling back counter");
                self.value.send_replace(previous);
                Err(ReconcileError::from_failure(&self.failure_message, e))
            }
        }
    }
}

/// Favorite-style on/off flag
pub struct OptimisticToggle {
    value: watch::Sender<bool>,
    in_flight: Mutex<()>,
    failure_message: String,
}

impl OptimisticToggle {
    pub fn new(initial: bool) -> Self {
        let (value, _) = watch::channel(initial);
        Self {
            value,
            in_flight: Mutex::new(()),
            failure_message: "No se pudo guardar el favorito".to_string(),
        }
    }

    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }

    pub fn get(&self) -> bool {
        *self.value.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.value.subscribe()
    }

    /// Flip now, then run `mutation`; the server's answer wins when present
    pub async fn toggle<F, Fut, E>(&self, mutation: F) -> Result<bool, ReconcileError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<bool>, E>>,
        E: Display,
    {
        let _guard = self.in_flight.lock().await;
        let previous = self.get();
        self.value.send_replace(!previous);

        match mutation().await {
            Ok(Some(server_value)) => {
                self.value.send_replace(server_value);
                Ok(server_value)
            }
            Ok(None) => Ok(!previous),
            Err(e) => {
                warn!(previous, error = %e, "Mutation failed; rolling back toggle");
                self.value.send_replace(previous);
                Err(ReconcileError::from_failure(&self.failure_message, e))
            }
        }
    }
}

/// Stock traffic light: YES/NO tallies plus the caller's own report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockTally {
    pub summary: StockSummary,
    pub mine: Option<StockStatus>,
}

impl StockTally {
    /// Local effect of the caller switching to `status`
    pub fn switched_to(mut self, status: StockStatus) -> Self {
        if self.mine == Some(status) {
            return self;
        }
        match self.mine {
            Some(StockStatus::Yes) => self.summary.yes = self.summary.yes.saturating_sub(1),
            Some(StockStatus::No) => self.summary.no = self.summary.no.saturating_sub(1),
            None => {}
        }
        self.summary.record(status);
        self.mine = Some(status);
        self
    }
}

pub struct OptimisticStockTally {
    value: watch::Sender<StockTally>,
    in_flight: Mutex<()>,
}

impl OptimisticStockTally {
    pub fn new(initial: StockTally) -> Self {
        let (value, _) = watch::channel(initial);
        Self {
            value,
            in_flight: Mutex::new(()),
        }
    }

    pub fn get(&self) -> StockTally {
        *self.value.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<StockTally> {
        self.value.subscribe()
    }

    pub async fn report<F, Fut, T, E>(&self, status: StockStatus, mutation: F) -> Result<StockTally, ReconcileError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let _guard = self.in_flight.lock().await;
        let previous = self.get();
        let next = previous.switched_to(status);
        self.value.send_replace(next);

        match mutation().await {
            Ok(_) => Ok(next),
            Err(e) => {
                self.value.send_replace(previous);
                Err(ReconcileError::from_failure("No se pudo reportar el stock", e))
            }
        }
    }
}
