//! Integration tests for the deal board
//!
//! These tests exercise the moderation ledger end to end through the
//! in-memory store, plus notification fan-out, optimistic client state
//! and the HTTP router.

use dealboard::models::{NewSubscription, SubscriptionKeys};
use dealboard::{
    AllowListPolicy, Caller, LedgerError, MemoryLedgerStore, ModerationLedger, ModerationThresholds, Offer,
    OfferDraft, OfferStatus, StaleViewRegistry, StockStatus,
};
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

const ADMIN: &str = "admin@ofertas.example";
const OWNER: &str = "ana@ofertas.example";

struct Harness {
    ledger: Arc<ModerationLedger>,
    store: Arc<MemoryLedgerStore>,
    views: Arc<StaleViewRegistry>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryLedgerStore::new());
    let views = Arc::new(StaleViewRegistry::new());
    let ledger = ModerationLedger::new(
        store.clone(),
        Arc::new(AllowListPolicy::new([ADMIN])),
        ModerationThresholds::default(),
    )
    .with_invalidator(views.clone());

    Harness {
        ledger: Arc::new(ledger),
        store,
        views,
    }
}

async fn publish(h: &Harness) -> Offer {
    h.ledger
        .create_offer(
            &Caller::user(OWNER),
            OfferDraft {
                title: Some("Smart TV 55\" 4K".to_string()),
                price: Some(499_999.0),
                store: Some("Electro Sur".to_string()),
                category: Some("Tecnología".to_string()),
                payment_methods: vec!["Mercado Pago".to_string(), "Efectivo".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

fn user(n: usize) -> Caller {
    Caller::user(format!("user{}@ofertas.example", n))
}

// ============================================================================
// Votes
// ============================================================================

mod votes {
    use super::*;

    #[tokio::test]
    async fn test_n_votes_add_n() {
        let h = harness();
        let offer = publish(&h).await;

        let mut last = 0;
        for _ in 0..7 {
            last = h.ledger.record_vote(offer.id).await.unwrap();
        }

        assert_eq!(last, 7);
        assert_eq!(h.ledger.get_offer(offer.id).await.unwrap().votes_count, 7);
    }

    #[tokio::test]
    async fn test_concurrent_votes_are_not_lost() {
        let h = harness();
        let offer = publish(&h).await;

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let ledger = h.ledger.clone();
                tokio::spawn(async move { ledger.record_vote(offer.id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(h.ledger.get_offer(offer.id).await.unwrap().votes_count, 25);
    }

    #[tokio::test]
    async fn test_vote_on_missing_offer() {
        let h = harness();
        let err = h.ledger.record_vote(uuid::Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }
}

// ============================================================================
// Stock Reports
// ============================================================================

mod stock_reports {
    use super::*;

    #[tokio::test]
    async fn test_latest_report_wins() {
        let h = harness();
        let offer = publish(&h).await;
        let caller = user(1);

        h.ledger.set_stock_report(&caller, offer.id, StockStatus::Yes).await.unwrap();
        h.ledger.set_stock_report(&caller, offer.id, StockStatus::No).await.unwrap();

        assert_eq!(h.store.stock_report_count(offer.id).await, 1);
        let summary = h.ledger.stock_summary(offer.id).await.unwrap();
        assert_eq!((summary.yes, summary.no), (0, 1));
    }

    #[tokio::test]
    async fn test_five_no_reports_expire_offer() {
        let h = harness();
        let offer = publish(&h).await;

        for n in 0..4 {
            let outcome = h.ledger.set_stock_report(&user(n), offer.id, StockStatus::No).await.unwrap();
            assert_eq!(outcome.offer_status, OfferStatus::Active);
        }

        let fifth = h.ledger.set_stock_report(&user(4), offer.id, StockStatus::No).await.unwrap();
        assert_eq!(fifth.negative_reports, 5);
        assert_eq!(fifth.offer_status, OfferStatus::Expired);
        assert!(fifth.transitioned);

        let sixth = h.ledger.set_stock_report(&user(5), offer.id, StockStatus::No).await.unwrap();
        assert_eq!(sixth.offer_status, OfferStatus::Expired);
        assert!(!sixth.transitioned);
    }

    #[tokio::test]
    async fn test_repeat_no_from_one_user_counts_once() {
        let h = harness();
        let offer = publish(&h).await;
        let caller = user(1);

        for _ in 0..6 {
            h.ledger.set_stock_report(&caller, offer.id, StockStatus::No).await.unwrap();
        }

        let offer = h.ledger.get_offer(offer.id).await.unwrap();
        assert_eq!(offer.status, OfferStatus::Active);
    }

    #[tokio::test]
    async fn test_concurrent_reports_transition_once() {
        let h = harness();
        let offer = publish(&h).await;

        let handles: Vec<_> = (0..12)
            .map(|n| {
                let ledger = h.ledger.clone();
                tokio::spawn(async move { ledger.set_stock_report(&user(n), offer.id, StockStatus::No).await })
            })
            .collect();

        let mut transitions = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().transitioned {
                transitions += 1;
            }
        }

        assert_eq!(transitions, 1);
        assert_eq!(h.ledger.get_offer(offer.id).await.unwrap().status, OfferStatus::Expired);
    }

    #[tokio::test]
    async fn test_anonymous_refused() {
        let h = harness();
        let offer = publish(&h).await;
        let err = h
            .ledger
            .set_stock_report(&Caller::anonymous(), offer.id, StockStatus::No)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthenticated));
        assert_eq!(h.store.stock_report_count(offer.id).await, 0);
    }
}

// ============================================================================
// Abuse Reports
// ============================================================================

mod abuse_reports {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_report() {
        let h = harness();
        let offer = publish(&h).await;
        let caller = user(1);

        h.ledger.file_report(&caller, offer.id, "Precio falso").await.unwrap();
        let err = h.ledger.file_report(&caller, offer.id, "Otra vez").await.unwrap_err();

        assert!(matches!(err, LedgerError::DuplicateReport));
        assert!(err.is_recoverable());
        assert_eq!(h.store.abuse_report_count(offer.id).await, 1);
    }

    #[tokio::test]
    async fn test_five_reports_reject_and_rejected_is_terminal() {
        let h = harness();
        let offer = publish(&h).await;

        for n in 0..5 {
            h.ledger.file_report(&user(n), offer.id, "Link roto").await.unwrap();
        }
        assert_eq!(h.ledger.get_offer(offer.id).await.unwrap().status, OfferStatus::Rejected);

        for target in [OfferStatus::Active, OfferStatus::Expired] {
            for actor in [Caller::user(OWNER), Caller::user(ADMIN)] {
                let err = h.ledger.set_offer_stock(&actor, offer.id, target).await.unwrap_err();
                assert!(matches!(err, LedgerError::InvalidTransition { .. }));
            }
        }
        assert_eq!(h.ledger.get_offer(offer.id).await.unwrap().status, OfferStatus::Rejected);
    }

    #[tokio::test]
    async fn test_blank_reason_rejected() {
        let h = harness();
        let offer = publish(&h).await;
        let err = h.ledger.file_report(&user(1), offer.id, "   ").await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(h.store.abuse_report_count(offer.id).await, 0);
    }

    #[tokio::test]
    async fn test_expired_offer_cannot_be_revived_after_abuse() {
        let h = harness();
        let offer = publish(&h).await;
        let owner = Caller::user(OWNER);
        h.ledger
            .set_offer_stock(&owner, offer.id, OfferStatus::Expired)
            .await
            .unwrap();

        for n in 0..4 {
            let outcome = h.ledger.file_report(&user(n), offer.id, "spam").await.unwrap();
            assert_eq!(outcome.offer_status, OfferStatus::Expired);
        }
        let fifth = h.ledger.file_report(&user(4), offer.id, "spam").await.unwrap();
        assert_eq!(fifth.total_reports, 5);
        assert_eq!(fifth.offer_status, OfferStatus::Rejected);
        assert!(fifth.transitioned);

        let err = h
            .ledger
            .set_offer_stock(&owner, offer.id, OfferStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
        assert_eq!(h.ledger.get_offer(offer.id).await.unwrap().status, OfferStatus::Rejected);
    }
}

// ============================================================================
// Favorites
// ============================================================================

mod favorites {
    use super::*;

    #[tokio::test]
    async fn test_toggle_parity() {
        let h = harness();
        let offer = publish(&h).await;
        let caller = user(1);

        for round in 1..=5 {
            let toggle = h.ledger.toggle_favorite(&caller, offer.id).await.unwrap();
            assert_eq!(toggle.added, round % 2 == 1);
        }
        assert_eq!(h.store.favorite_count(offer.id).await, 1);

        h.ledger.toggle_favorite(&caller, offer.id).await.unwrap();
        assert_eq!(h.store.favorite_count(offer.id).await, 0);
        assert!(h.ledger.list_favorites(&caller).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_favorites_list_and_profile_invalidated() {
        let h = harness();
        let offer = publish(&h).await;
        h.views.drain();

        h.ledger.toggle_favorite(&user(1), offer.id).await.unwrap();

        let favorites = h.ledger.list_favorites(&user(1)).await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, offer.id);
        assert!(h.views.is_stale("/perfil"));
        assert!(h.views.is_stale(&format!("/oferta/{}", offer.id)));
    }
}

// ============================================================================
// Authorization
// ============================================================================

mod authorization {
    use super::*;

    #[tokio::test]
    async fn test_stranger_cannot_override_stock() {
        let h = harness();
        let offer = publish(&h).await;

        let err = h
            .ledger
            .set_offer_stock(&user(9), offer.id, OfferStatus::Expired)
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(h.ledger.get_offer(offer.id).await.unwrap().status, OfferStatus::Active);
    }

    #[tokio::test]
    async fn test_owner_and_admin_can_override() {
        let h = harness();
        let offer = publish(&h).await;

        let expired = h
            .ledger
            .set_offer_stock(&Caller::user(OWNER), offer.id, OfferStatus::Expired)
            .await
            .unwrap();
        assert_eq!(expired.status, OfferStatus::Expired);

        let active = h
            .ledger
            .set_offer_stock(&Caller::user(ADMIN), offer.id, OfferStatus::Active)
            .await
            .unwrap();
        assert_eq!(active.status, OfferStatus::Active);
    }

    #[tokio::test]
    async fn test_custom_policy() {
        let store = Arc::new(MemoryLedgerStore::new());
        let moderators = |user_id: &str| user_id.ends_with("@moderacion.example");
        let ledger = ModerationLedger::new(store, Arc::new(moderators), ModerationThresholds::default());

        let offer = ledger
            .create_offer(&Caller::anonymous(), OfferDraft::default())
            .await
            .unwrap();
        assert_eq!(offer.title, "Sin título");
        assert!(offer.owner_id.is_none());

        ledger
            .delete_offer(&Caller::user("sol@moderacion.example"), offer.id)
            .await
            .unwrap();
        assert!(matches!(
            ledger.get_offer(offer.id).await,
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_cascades_engagement() {
        let h = harness();
        let offer = publish(&h).await;
        h.ledger.toggle_favorite(&user(1), offer.id).await.unwrap();
        h.ledger.file_report(&user(2), offer.id, "duplicada").await.unwrap();
        h.ledger.add_comment(&user(3), offer.id, "¡Gracias!").await.unwrap();

        h.ledger.delete_offer(&Caller::user(OWNER), offer.id).await.unwrap();

        assert_eq!(h.store.favorite_count(offer.id).await, 0);
        assert_eq!(h.store.abuse_report_count(offer.id).await, 0);
        assert!(h.ledger.list_favorites(&user(1)).await.unwrap().is_empty());
    }
}

// ============================================================================
// Notifications
// ============================================================================

mod notifications {
    use super::*;
    use async_trait::async_trait;
    use dealboard::models::PushSubscription;
    use dealboard::notify::{AlertPayload, DeliveryError, PushTransport};
    use dealboard::{NotificationService, SubscriptionStore};

    struct GoneFor(&'static str);

    #[async_trait]
    impl PushTransport for GoneFor {
        async fn deliver(&self, sub: &PushSubscription, _: &AlertPayload) -> Result<(), DeliveryError> {
            if sub.endpoint.contains(self.0) {
                Err(DeliveryError::Gone(410))
            } else {
                Ok(())
            }
        }
    }

    fn subscription(endpoint: &str) -> NewSubscription {
        NewSubscription {
            endpoint: endpoint.to_string(),
            keys: SubscriptionKeys {
                p256dh: "key".to_string(),
                auth: "auth".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_broadcast_prunes_gone_endpoints() {
        let store = Arc::new(MemoryLedgerStore::new());
        let service = NotificationService::new(
            store.clone(),
            Arc::new(GoneFor("expired-browser")),
            Arc::new(AllowListPolicy::new([ADMIN])),
        );

        service
            .subscribe(&Caller::anonymous(), subscription("https://push.example/live"))
            .await
            .unwrap();
        service
            .subscribe(&user(1), subscription("https://push.example/expired-browser"))
            .await
            .unwrap();

        let report = service
            .broadcast_alert(&Caller::user(ADMIN), "Bajó el café", "/oferta/x")
            .await
            .unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.pruned, 1);
        let remaining = store.list_subscriptions().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].endpoint, "https://push.example/live");
    }
}

// ============================================================================
// Optimistic Client State
// ============================================================================

mod optimistic {
    use super::*;
    use dealboard::{OptimisticCounter, OptimisticToggle};

    #[tokio::test]
    async fn test_counter_tracks_ledger() {
        let h = harness();
        let offer = publish(&h).await;
        let counter = OptimisticCounter::new(offer.votes_count);

        let ledger = h.ledger.clone();
        let votes = counter
            .apply(1, || async move { ledger.record_vote(offer.id).await.map(Some) })
            .await
            .unwrap();

        assert_eq!(votes, 1);
        assert_eq!(counter.get(), 1);
    }

    #[tokio::test]
    async fn test_toggle_rolls_back_when_unauthenticated() {
        let h = harness();
        let offer = publish(&h).await;
        let toggle = OptimisticToggle::new(false);

        let ledger = h.ledger.clone();
        let err = toggle
            .toggle(|| async move {
                ledger
                    .toggle_favorite(&Caller::anonymous(), offer.id)
                    .await
                    .map(|t| Some(t.added))
            })
            .await
            .unwrap_err();

        assert_eq!(err.detail, LedgerError::Unauthenticated.to_string());
        assert!(!toggle.get());
    }
}

// ============================================================================
// HTTP
// ============================================================================

mod http {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use dealboard::models::PushSubscription;
    use dealboard::notify::{AlertPayload, DeliveryError, PushTransport};
    use dealboard::{ApiState, NotificationService, create_router};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct Sink;

    #[async_trait]
    impl PushTransport for Sink {
        async fn deliver(&self, _: &PushSubscription, _: &AlertPayload) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    fn router(h: &Harness) -> axum::Router {
        let notifications = NotificationService::new(
            h.store.clone(),
            Arc::new(Sink),
            Arc::new(AllowListPolicy::new([ADMIN])),
        );
        create_router(ApiState {
            ledger: h.ledger.clone(),
            notifications: Arc::new(notifications),
            views: h.views.clone(),
        })
    }

    async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(method: &str, uri: &str, user: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-user-id", user)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_stock_reports_expire_over_http() {
        let h = harness();
        let offer = publish(&h).await;
        let app = router(&h);
        let uri = format!("/offers/{}/stock-reports", offer.id);

        let mut last = Value::Null;
        for n in 0..5 {
            let (status, body) = send(
                &app,
                json_request("POST", &uri, &format!("u{}", n), json!({ "status": "NO" })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            last = body;
        }
        assert_eq!(last["offer_status"], "expired");

        let (status, summary) = send(&app, Request::get(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["no"], 5);
    }

    #[tokio::test]
    async fn test_listing_filters() {
        let h = harness();
        let offer = publish(&h).await;
        h.ledger
            .create_offer(
                &Caller::anonymous(),
                OfferDraft {
                    title: Some("Pan dulce".to_string()),
                    category: Some("Almacén".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let app = router(&h);

        let (status, offers) = send(
            &app,
            Request::get("/offers?category=tecnolog%C3%ADa&q=smart").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let offers = offers.as_array().unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0]["id"], offer.id.to_string());
        assert_eq!(offers[0]["payment_methods"], json!(["Efectivo", "Mercado Pago"]));
    }

    #[tokio::test]
    async fn test_comments_and_profile() {
        let h = harness();
        let offer = publish(&h).await;
        let app = router(&h);
        let uri = format!("/offers/{}/comments", offer.id);

        let (status, _) = send(&app, json_request("POST", &uri, "u1", json!({ "text": "" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, comment) = send(&app, json_request("POST", &uri, "u1", json!({ "text": "Vale la pena" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment["user_id"], "u1");

        let (_, comments) = send(&app, Request::get(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(comments.as_array().unwrap().len(), 1);

        let (status, profile) = send(
            &app,
            json_request("PUT", "/me/profile", "u1", json!({ "location": "Rosario" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["location"], "Rosario");
        assert!(h.views.is_stale("/configuracion"));
    }

    async fn serve_gated(app: axum::Router, token: &str) -> String {
        use dealboard::api::{SecurityMiddlewareConfig, SecurityState, gateway_middleware};

        let state = SecurityState::new(SecurityMiddlewareConfig {
            gateway_token: Some(token.to_string()),
            ..Default::default()
        });
        let app = app.layer(axum::middleware::from_fn_with_state(state, gateway_middleware));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_client_passes_gateway_check() {
        use dealboard::LedgerStore;
        use dealboard::client::ApiClientConfig;

        let h = harness();
        let offer = publish(&h).await;
        let base_url = serve_gated(router(&h), "s3cret").await;

        let client = dealboard::ApiClient::new(ApiClientConfig {
            base_url: base_url.clone(),
            timeout_secs: 5,
            gateway_token: Some("s3cret".to_string()),
        })
        .unwrap()
        .as_user("luis@ofertas.example");
        assert!(client.toggle_favorite(offer.id).await.unwrap());
        assert_eq!(client.vote(offer.id).await.unwrap(), 1);

        let outcome = client.report_stock(offer.id, StockStatus::Yes).await.unwrap();
        assert_eq!(outcome.status, StockStatus::Yes);
        assert_eq!(outcome.negative_reports, 0);

        let ungated = dealboard::ApiClient::new(ApiClientConfig {
            base_url,
            timeout_secs: 5,
            gateway_token: None,
        })
        .unwrap()
        .as_user("luis@ofertas.example");
        let err = ungated.toggle_favorite(offer.id).await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert!(
            h.store
                .list_favorites("luis@ofertas.example")
                .await
                .unwrap()
                .iter()
                .any(|o| o.id == offer.id)
        );
    }
}

// ============================================================================
// Admin moderation
// ============================================================================

mod admin {
    use super::*;
    use dealboard::{LedgerStore, SubscriptionStore};

    #[tokio::test]
    async fn test_ban_cascades_to_owned_offers() {
        let h = harness();
        let offer = publish(&h).await;
        let admin = Caller::user(ADMIN);

        h.ledger.toggle_favorite(&user(1), offer.id).await.unwrap();
        h.ledger.file_report(&user(2), offer.id, "precio inflado").await.unwrap();
        h.store
            .upsert_subscription(
                &NewSubscription {
                    endpoint: "https://push.example/ana".to_string(),
                    keys: SubscriptionKeys {
                        p256dh: "p".to_string(),
                        auth: "a".to_string(),
                    },
                },
                Some(OWNER),
            )
            .await
            .unwrap();

        let outcome = h.ledger.ban_user(&admin, OWNER).await.unwrap();
        assert_eq!(outcome.removed_offers, vec![offer.id]);

        assert_eq!(h.store.offer_count().await, 0);
        assert_eq!(h.store.abuse_report_count(offer.id).await, 0);
        assert!(h.store.list_favorites("user1@ofertas.example").await.unwrap().is_empty());
        assert!(h.store.list_subscriptions().await.unwrap().is_empty());

        let users = h.ledger.list_users(&admin).await.unwrap();
        assert!(users.iter().all(|u| u.user_id != OWNER));
        assert!(h.views.is_stale("/admin/usuarios"));
    }

    #[tokio::test]
    async fn test_admins_cannot_be_banned() {
        let h = harness();
        h.ledger
            .create_offer(
                &Caller::user(ADMIN),
                OfferDraft {
                    title: Some("Destacada".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = h.ledger.ban_user(&Caller::user(ADMIN), ADMIN).await.unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));
        assert_eq!(h.store.offer_count().await, 1);

        let err = h.ledger.ban_user(&Caller::user(OWNER), ADMIN).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_stats_track_moderation() {
        let h = harness();
        let admin = Caller::user(ADMIN);
        let expired = publish(&h).await;
        let flagged = publish(&h).await;
        publish(&h).await;

        for n in 0..5 {
            h.ledger
                .set_stock_report(&user(n), expired.id, StockStatus::No)
                .await
                .unwrap();
            h.ledger.file_report(&user(n), flagged.id, "spam").await.unwrap();
        }

        let stats = h.ledger.stats(&admin).await.unwrap();
        assert_eq!(stats.offers, 3);
        assert_eq!(stats.active_offers, 1);
        assert_eq!(stats.expired_offers, 1);
        assert_eq!(stats.rejected_offers, 1);
        // the owner plus five reporters
        assert_eq!(stats.users, 6);
    }
}
