use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;
use web_push::{
    ContentEncoding, SubscriptionInfo, VapidSignature, VapidSignatureBuilder, WebPushError, WebPushMessage,
    WebPushMessageBuilder,
};

use crate::models::PushSubscription;
use crate::notify::service::AlertPayload;

/// Outcome of a failed delivery to one endpoint
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Encryption or signing failed before anything was sent
    #[error("could not prepare message: {0}")]
    Prepare(String),

    /// The push service no longer knows the endpoint; it should be pruned
    #[error("endpoint gone (status {0})")]
    Gone(u16),

    #[error("delivery failed: {0}")]
    Failed(String),
}

impl From<WebPushError> for DeliveryError {
    fn from(err: WebPushError) -> Self {
        DeliveryError::Prepare(err.to_string())
    }
}

impl DeliveryError {
    pub fn is_gone(&self) -> bool {
        matches!(self, DeliveryError::Gone(_))
    }
}

/// Delivers one payload to one subscriber endpoint
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn deliver(&self, subscription: &PushSubscription, payload: &AlertPayload) -> Result<(), DeliveryError>;
}

/// Application server identity for push services
#[derive(Clone)]
pub struct VapidConfig {
    /// Uncompressed P-256 public key, base64url; browsers need it to subscribe
    pub public_key: String,
    /// Raw P-256 private scalar, base64url
    pub private_key: String,
    /// `mailto:` or `https://` contact for the push service operator
    pub subject: String,
}

impl std::fmt::Debug for VapidConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidConfig")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("subject", &self.subject)
            .finish()
    }
}

/// Transport settings for outbound push requests
#[derive(Debug, Clone)]
pub struct PushTransportConfig {
    /// Refuse endpoints that are not https
    pub require_https: bool,
    pub timeout_secs: u64,
    /// Seconds the push service may hold the message
    pub ttl_secs: u32,
    /// `very-low`, `low`, `normal` or `high`
    pub urgency: String,
    /// Plaintext limit before encryption
    pub max_payload_bytes: usize,
    /// Without keys, messages go out unsigned and most push services refuse them
    pub vapid: Option<VapidConfig>,
}

impl Default for PushTransportConfig {
    fn default() -> Self {
        Self {
            require_https: true,
            timeout_secs: 10,
            ttl_secs: 86_400,
            urgency: "normal".to_string(),
            max_payload_bytes: 3800,
            vapid: None,
        }
    }
}

/// Encrypts alert payloads (RFC 8291, aes128gcm), signs them with VAPID
/// and posts them to subscriber endpoints
#[derive(Clone)]
pub struct HttpPushTransport {
    client: Client,
    config: PushTransportConfig,
}

impl HttpPushTransport {
    pub fn new(config: PushTransportConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("dealboard/", env!("CARGO_PKG_VERSION")));

        if config.require_https {
            builder = builder.https_only(true);
            info!("HTTPS enforcement enabled for push delivery");
        }

        match &config.vapid {
            Some(vapid) => {
                VapidSignatureBuilder::from_base64_no_sub(&vapid.private_key, web_push::URL_SAFE_NO_PAD)
                    .map_err(|e| anyhow::anyhow!("Invalid VAPID private key: {}", e))?;
                info!(subject = %vapid.subject, "VAPID signing enabled for push delivery");
            }
            None => warn!("Push delivery without VAPID keys; most push services will reject alerts"),
        }

        let client = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create push HTTP client: {}", e))?;

        Ok(Self { client, config })
    }

    fn validate_endpoint(&self, endpoint: &str) -> Result<Url, DeliveryError> {
        let url = Url::parse(endpoint).map_err(|e| DeliveryError::Failed(format!("invalid endpoint: {}", e)))?;

        if self.config.require_https && url.scheme() != "https" {
            return Err(DeliveryError::Failed(format!(
                "HTTPS is required but endpoint uses {}",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(DeliveryError::Failed("endpoint has no host".to_string()));
        }

        Ok(url)
    }

    /// Key browsers pass as `applicationServerKey` when subscribing
    pub fn vapid_public_key(&self) -> Option<&str> {
        self.config.vapid.as_ref().map(|v| v.public_key.as_str())
    }

    fn sign(&self, info: &SubscriptionInfo) -> Result<Option<VapidSignature>, DeliveryError> {
        let Some(vapid) = &self.config.vapid else {
            return Ok(None);
        };
        let mut builder = VapidSignatureBuilder::from_base64(&vapid.private_key, web_push::URL_SAFE_NO_PAD, info)?;
        builder.add_claim("sub", vapid.subject.as_str());
        Ok(Some(builder.build()?))
    }

    /// Encrypt `body` for the subscriber's keys
    fn seal(&self, subscription: &PushSubscription, body: &[u8]) -> Result<WebPushMessage, DeliveryError> {
        let info = SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.p256dh.clone(),
            subscription.auth.clone(),
        );

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, body);
        builder.set_ttl(self.config.ttl_secs);
        if let Some(signature) = self.sign(&info)? {
            builder.set_vapid_signature(signature);
        }
        Ok(builder.build()?)
    }
}

#[async_trait]
impl PushTransport for HttpPushTransport {
    async fn deliver(&self, subscription: &PushSubscription, payload: &AlertPayload) -> Result<(), DeliveryError> {
        let url = self.validate_endpoint(&subscription.endpoint)?;

        let body = serde_json::to_vec(payload).map_err(|e| DeliveryError::Failed(e.to_string()))?;
        if body.len() > self.config.max_payload_bytes {
            return Err(DeliveryError::Failed(format!(
                "payload too large: {} bytes (max: {})",
                body.len(),
                self.config.max_payload_bytes
            )));
        }

        let message = self.seal(subscription, &body)?;
        let mut request = self
            .client
            .post(url.as_str())
            .header("TTL", message.ttl.to_string())
            .header("Urgency", self.config.urgency.as_str());
        request = match message.payload {
            Some(sealed) => {
                for (name, value) in sealed.crypto_headers {
                    request = request.header(name, value);
                }
                request
                    .header("Content-Encoding", sealed.content_encoding.to_str())
                    .header("Content-Type", "application/octet-stream")
                    .body(sealed.content)
            }
            None => request.header("Content-Length", "0"),
        };

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Failed(e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                debug!(subscription_id = %subscription.id, status = status.as_u16(), "Push endpoint gone");
                Err(DeliveryError::Gone(status.as_u16()))
            }
            s if s.is_success() => Ok(()),
            s => {
                warn!(subscription_id = %subscription.id, status = s.as_u16(), "Push delivery rejected");
                Err(DeliveryError::Failed(format!(
                    "push service answered {}: {}",
                    s.as_u16(),
                    s.canonical_reason().unwrap_or("Unknown")
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_validation() {
        let transport = HttpPushTransport::new(PushTransportConfig::default()).unwrap();

        assert!(transport.validate_endpoint("https://fcm.googleapis.com/fcm/send/abc").is_ok());
        assert!(matches!(
            transport.validate_endpoint("http://fcm.googleapis.com/fcm/send/abc"),
            Err(DeliveryError::Failed(_))
        ));
        assert!(transport.validate_endpoint("not a url").is_err());
    }

    #[test]
    fn test_gone_classification() {
        assert!(DeliveryError::Gone(410).is_gone());
        assert!(!DeliveryError::Failed("timeout".to_string()).is_gone());
        assert!(!DeliveryError::Prepare("bad key".to_string()).is_gone());
    }

    #[test]
    fn test_invalid_vapid_key_refused() {
        let config = PushTransportConfig {
            vapid: Some(VapidConfig {
                public_key: "BPub".to_string(),
                private_key: "not-a-key".to_string(),
                subject: "mailto:admin@ofertas.example".to_string(),
            }),
            ..PushTransportConfig::default()
        };
        assert!(HttpPushTransport::new(config).is_err());
    }

    #[tokio::test]
    async fn test_malformed_subscriber_keys_fail_before_sending() {
        let transport = HttpPushTransport::new(PushTransportConfig::default()).unwrap();
        let subscription = PushSubscription {
            id: uuid::Uuid::new_v4(),
            endpoint: "https://push.invalid/abc".to_string(),
            p256dh: "BNc...".to_string(),
            auth: "tBH...".to_string(),
            user_id: None,
            created_at: chrono::Utc::now(),
        };
        let payload = AlertPayload::alert("2x1", "/");

        let err = transport.deliver(&subscription, &payload).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Prepare(_)));
        assert!(!err.is_gone());
    }

    #[tokio::test]
    async fn test_oversized_payload_refused() {
        let transport = HttpPushTransport::new(PushTransportConfig {
            max_payload_bytes: 16,
            ..PushTransportConfig::default()
        })
        .unwrap();
        let subscription = PushSubscription {
            id: uuid::Uuid::new_v4(),
            endpoint: "https://push.invalid/abc".to_string(),
            p256dh: "p".to_string(),
            auth: "a".to_string(),
            user_id: None,
            created_at: chrono::Utc::now(),
        };
        let payload = AlertPayload::alert("Bajó la tele a mitad de precio", "/");
        assert!(matches!(
            transport.deliver(&subscription, &payload).await,
            Err(DeliveryError::Failed(_))
        ));
    }
}
