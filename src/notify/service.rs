use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::LedgerError;
use crate::ledger::{AuthorizationPolicy, SubscriptionStore, ensure_admin};
use crate::models::{Caller, NewSubscription, PushSubscription};
use crate::notify::transport::{DeliveryError, PushTransport};

pub const ALERT_TITLE: &str = "🔥 ¡Alerta de Oferta!";
pub const ALERT_ICON: &str = "/icon.png";
pub const MAX_ALERT_LEN: usize = 280;
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// JSON body a service worker receives for an alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub title: String,
    pub body: String,
    pub url: String,
    pub icon: String,
}

impl AlertPayload {
    /// An empty url falls back to the listing page
    pub fn alert(message: &str, url: &str) -> Self {
        let url = url.trim();
        Self {
            title: ALERT_TITLE.to_string(),
            body: message.trim().to_string(),
            url: if url.is_empty() { "/".to_string() } else { url.to_string() },
            icon: ALERT_ICON.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
    pub pruned: usize,
    pub failed: usize,
}

pub struct NotificationService {
    store: Arc<dyn SubscriptionStore>,
    transport: Arc<dyn PushTransport>,
    policy: Arc<dyn AuthorizationPolicy>,
    /// Deliveries in flight at once during a broadcast
    max_concurrency: usize,
    vapid_public_key: Option<String>,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn PushTransport>,
        policy: Arc<dyn AuthorizationPolicy>,
    ) -> Self {
        Self {
            store,
            transport,
            policy,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            vapid_public_key: None,
        }
    }

    pub fn with_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_public_key(mut self, public_key: Option<String>) -> Self {
        self.vapid_public_key = public_key;
        self
    }

    pub fn vapid_public_key(&self) -> Option<&str> {
        self.vapid_public_key.as_deref()
    }

    /// Anonymous browsers may subscribe too
    pub async fn subscribe(
        &self,
        caller: &Caller,
        subscription: NewSubscription,
    ) -> Result<PushSubscription, LedgerError> {
        subscription.validate()?;
        let stored = self
            .store
            .upsert_subscription(&subscription, caller.user_id())
            .await?;

        debug!(subscription_id = %stored.id, anonymous = caller.is_anonymous(), "Push subscription stored");
        Ok(stored)
    }

    /// Fan out an alert to every subscriber; endpoints that are gone get pruned
    pub async fn broadcast_alert(
        &self,
        caller: &Caller,
        message: &str,
        url: &str,
    ) -> Result<BroadcastReport, LedgerError> {
        let admin = ensure_admin(self.policy.as_ref(), caller)?;

        let payload = AlertPayload::alert(message, url);
        if payload.body.is_empty() {
            return Err(LedgerError::Validation("alert message is required".to_string()));
        }
        if payload.body.chars().count() > MAX_ALERT_LEN {
            return Err(LedgerError::Validation(format!(
                "alert message exceeds {} characters",
                MAX_ALERT_LEN
            )));
        }

        let subscriptions = self.store.list_subscriptions().await?;
        let payload = &payload;
        let results: Vec<_> = stream::iter(subscriptions.iter().cloned())
            .map(|sub| {
                let transport = Arc::clone(&self.transport);
                async move {
                    let result = transport.deliver(&sub, payload).await;
                    (sub, result)
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut report = BroadcastReport {
            attempted: subscriptions.len(),
            ..Default::default()
        };

        for (sub, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Gone(status)) => {
                    debug!(subscription_id = %sub.id, status, "Pruning gone subscription");
                    match self.store.delete_subscription(sub.id).await {
                        Ok(_) => report.pruned += 1,
                        Err(e) => {
                            warn!(subscription_id = %sub.id, error = %e, "Failed to prune subscription");
                            report.failed += 1;
                        }
                    }
                }
                Err(err @ DeliveryError::Prepare(_)) => {
                    warn!(subscription_id = %sub.id, error = %err, "Push message could not be prepared");
                    report.failed += 1;
                }
                Err(DeliveryError::Failed(reason)) => {
                    warn!(subscription_id = %sub.id, reason = %reason, "Push delivery failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            admin = %admin,
            attempted = report.attempted,
            delivered = report.delivered,
            pruned = report.pruned,
            failed = report.failed,
            "Alert broadcast finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AllowListPolicy, MemoryLedgerStore};
    use crate::models::SubscriptionKeys;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers per endpoint suffix and records what was sent
    #[derive(Default)]
    struct ScriptedTransport {
        answers: HashMap<String, DeliveryError>,
        sent: Mutex<Vec<AlertPayload>>,
    }

    #[async_trait]
    impl PushTransport for ScriptedTransport {
        async fn deliver(&self, sub: &PushSubscription, payload: &AlertPayload) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(payload.clone());
            match self.answers.iter().find(|(suffix, _)| sub.endpoint.ends_with(suffix.as_str())) {
                Some((_, err)) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    fn subscription(endpoint: &str) -> NewSubscription {
        NewSubscription {
            endpoint: endpoint.to_string(),
            keys: SubscriptionKeys {
                p256dh: "BNc...".to_string(),
                auth: "tBH...".to_string(),
            },
        }
    }

    fn service(transport: ScriptedTransport) -> (NotificationService, Arc<MemoryLedgerStore>) {
        let store = Arc::new(MemoryLedgerStore::new());
        let service = NotificationService::new(
            store.clone(),
            Arc::new(transport),
            Arc::new(AllowListPolicy::new(["admin@ofertas.example"])),
        );
        (service, store)
    }

    #[tokio::test]
    async fn test_broadcast_prunes_gone_endpoints() {
        let mut transport = ScriptedTransport::default();
        transport.answers.insert("/gone".to_string(), DeliveryError::Gone(410));
        transport.answers.insert("/missing".to_string(), DeliveryError::Gone(404));
        transport
            .answers
            .insert("/flaky".to_string(), DeliveryError::Failed("503".to_string()));
        let (service, store) = service(transport);

        let anon = Caller::anonymous();
        for endpoint in ["ok", "gone", "missing", "flaky"] {
            service
                .subscribe(&anon, subscription(&format!("https://push.example/{}", endpoint)))
                .await
                .unwrap();
        }

        let admin = Caller::user("admin@ofertas.example");
        let report = service.broadcast_alert(&admin, "2x1 en café", "/oferta/1").await.unwrap();

        assert_eq!(
            report,
            BroadcastReport {
                attempted: 4,
                delivered: 1,
                pruned: 2,
                failed: 1,
            }
        );
        assert_eq!(store.list_subscriptions().await.unwrap().len(), 2);
    }

    /// Tracks how many deliveries overlap
    #[derive(Default)]
    struct SlowTransport {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl PushTransport for SlowTransport {
        async fn deliver(&self, _: &PushSubscription, _: &AlertPayload) -> Result<(), DeliveryError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_broadcast_bounds_concurrency() {
        let transport = Arc::new(SlowTransport::default());
        let store = Arc::new(MemoryLedgerStore::new());
        let service = NotificationService::new(
            store,
            transport.clone(),
            Arc::new(AllowListPolicy::new(["admin@ofertas.example"])),
        )
        .with_concurrency(3);

        for n in 0..12 {
            service
                .subscribe(&Caller::anonymous(), subscription(&format!("https://push.example/{}", n)))
                .await
                .unwrap();
        }

        let report = service
            .broadcast_alert(&Caller::user("admin@ofertas.example"), "Hot sale", "/")
            .await
            .unwrap();
        assert_eq!(report.delivered, 12);
        let peak = transport.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {}", peak);
        assert!(peak > 1);
    }

    #[tokio::test]
    async fn test_broadcast_requires_admin() {
        let (service, _) = service(ScriptedTransport::default());

        let err = service
            .broadcast_alert(&Caller::user("luis"), "hola", "/")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));

        let err = service
            .broadcast_alert(&Caller::anonymous(), "hola", "/")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_blank_alert_rejected() {
        let (service, _) = service(ScriptedTransport::default());
        let admin = Caller::user("admin@ofertas.example");
        assert!(matches!(
            service.broadcast_alert(&admin, "   ", "/").await,
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_alert_payload_shape() {
        let payload = AlertPayload::alert(" Bajó la tele ", "");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["title"], ALERT_TITLE);
        assert_eq!(json["body"], "Bajó la tele");
        assert_eq!(json["url"], "/");
        assert_eq!(json["icon"], "/icon.png");
    }
}
