//! Stale view tracking
//!
//! After a mutation the ledger marks rendered pages stale. The signal is
//! fire-and-forget: invalidation never fails and never blocks the caller.
//! A renderer drains the registry and regenerates what it finds.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::trace;

/// Page paths the marketplace renders
pub mod paths {
    use uuid::Uuid;

    pub const LISTING: &str = "/";
    pub const PROFILE: &str = "/perfil";
    pub const SETTINGS: &str = "/configuracion";
    pub const ADMIN_USERS: &str = "/admin/usuarios";

    pub fn offer_detail(offer_id: Uuid) -> String {
        format!("/oferta/{}", offer_id)
    }
}

pub trait ViewInvalidator: Send + Sync {
    fn invalidate(&self, path: &str);
}

/// Discards every signal
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl ViewInvalidator for NoopInvalidator {
    fn invalidate(&self, _path: &str) {}
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StaleView {
    pub path: String,
    /// First invalidation since the last drain
    pub stale_since: DateTime<Utc>,
}

/// Concurrent registry of stale paths
#[derive(Debug, Default)]
pub struct StaleViewRegistry {
    stale: DashMap<String, DateTime<Utc>>,
}

impl StaleViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stale(&self, path: &str) -> bool {
        self.stale.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.stale.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stale.is_empty()
    }

    /// Remove and return everything stale, oldest first
    pub fn drain(&self) -> Vec<StaleView> {
        let keys: Vec<String> = self.stale.iter().map(|e| e.key().clone()).collect();
        let mut views: Vec<StaleView> = keys
            .into_iter()
            .filter_map(|k| self.stale.remove(&k))
            .map(|(path, stale_since)| StaleView { path, stale_since })
            .collect();
        views.sort_by(|a, b| a.stale_since.cmp(&b.stale_since).then(a.path.cmp(&b.path)));
        views
    }
}

impl ViewInvalidator for StaleViewRegistry {
    fn invalidate(&self, path: &str) {
        trace!(path = %path, "View marked stale");
        self.stale.entry(path.to_string()).or_insert_with(Utc::now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_invalidate_and_drain() {
        let registry = StaleViewRegistry::new();
        let id = Uuid::new_v4();

        registry.invalidate(paths::LISTING);
        registry.invalidate(&paths::offer_detail(id));
        registry.invalidate(paths::LISTING);

        assert_eq!(registry.len(), 2);
        assert!(registry.is_stale(&format!("/oferta/{}", id)));

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_repeat_invalidation_keeps_first_time() {
        let registry = StaleViewRegistry::new();
        registry.invalidate(paths::PROFILE);
        let first = registry.stale.get(paths::PROFILE).map(|e| *e.value()).unwrap();
        registry.invalidate(paths::PROFILE);

        let drained = registry.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].stale_since, first);
    }
}
