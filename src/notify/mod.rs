//! Push notifications
//!
//! Subscriptions are stored through `SubscriptionStore`; alerts go out
//! through a `PushTransport`. `HttpPushTransport` encrypts each payload
//! for the subscriber's keys and signs the request with VAPID.

pub mod service;
pub mod transport;

pub use service::{AlertPayload, BroadcastReport, NotificationService};
pub use transport::{DeliveryError, HttpPushTransport, PushTransport, PushTransportConfig, VapidConfig};
