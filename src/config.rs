use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::{info, warn};

use crate::api::SecurityMiddlewareConfig;
use crate::ledger::{AllowListPolicy, ModerationThresholds};
use crate::notify::service::DEFAULT_MAX_CONCURRENCY;
use crate::notify::{PushTransportConfig, VapidConfig};

const ENV_PREFIX: &str = "DEALBOARD_";
const URGENCIES: [&str; 4] = ["very-low", "low", "normal", "high"];
const DEFAULT_VAPID_SUBJECT: &str = "mailto:admin@localhost";

/// Service configuration, loaded from `DEALBOARD_*` environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub moderation: ModerationConfig,
    pub admin: AdminConfig,
    pub push: PushConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Shared secret expected from the auth gateway
    pub gateway_token: Option<String>,
    /// Accept `x-user-id` without a gateway token even when admins exist.
    /// Only for deployments where nothing but the gateway can reach the service.
    pub trust_identity_header: bool,
    /// Mutating requests per minute per caller
    pub rate_limit_per_minute: u32,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub postgres_url: String,
    /// When false the in-memory store is used
    pub postgres_enabled: bool,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// error, warn, info, debug or trace
    pub level: String,
    /// Mask identities and keys in logs
    pub sanitize_logs: bool,
    pub log_requests: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub stock_expiry_threshold: u64,
    pub abuse_rejection_threshold: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// User identities with admin rights
    pub admins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    pub require_https: bool,
    pub timeout_secs: u64,
    pub ttl_secs: u32,
    pub urgency: String,
    /// Simultaneous deliveries during a broadcast
    pub max_concurrency: usize,
    /// Application server key handed to browsers (base64url)
    pub vapid_public_key: Option<String>,
    /// Signing key for VAPID (base64url, raw P-256 scalar)
    #[serde(skip_serializing)]
    pub vapid_private_key: Option<String>,
    /// Contact claim sent to push services
    pub vapid_subject: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        let thresholds = ModerationThresholds::default();
        let transport = PushTransportConfig::default();
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            security: SecurityConfig {
                gateway_token: None,
                trust_identity_header: false,
                rate_limit_per_minute: 30,
                max_request_size: 64 * 1024,
            },
            database: DatabaseConfig {
                postgres_url: "postgresql://localhost:5432/dealboard".to_string(),
                postgres_enabled: false,
                max_connections: 10,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                sanitize_logs: true,
                log_requests: true,
            },
            moderation: ModerationConfig {
                stock_expiry_threshold: thresholds.stock_expiry_threshold,
                abuse_rejection_threshold: thresholds.abuse_rejection_threshold,
            },
            admin: AdminConfig::default(),
            push: PushConfig {
                require_https: transport.require_https,
                timeout_secs: transport.timeout_secs,
                ttl_secs: transport.ttl_secs,
                urgency: transport.urgency,
                max_concurrency: DEFAULT_MAX_CONCURRENCY,
                vapid_public_key: None,
                vapid_private_key: None,
                vapid_subject: DEFAULT_VAPID_SUBJECT.to_string(),
            },
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let key = format!("{}{}", ENV_PREFIX, name);
    if let Some(raw) = lookup(&key) {
        *target = raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {} value", key))?;
    }
    Ok(())
}

impl HubConfig {
    /// Load from the process environment and validate
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from any key lookup and validate
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(host) = var("HOST") {
            config.server.host = host;
        }
        parse_var(&lookup, "PORT", &mut config.server.port)?;

        config.security.gateway_token = var("GATEWAY_TOKEN").filter(|t| !t.trim().is_empty());
        parse_var(&lookup, "TRUST_IDENTITY_HEADER", &mut config.security.trust_identity_header)?;
        parse_var(&lookup, "RATE_LIMIT_PER_MINUTE", &mut config.security.rate_limit_per_minute)?;
        parse_var(&lookup, "MAX_REQUEST_SIZE", &mut config.security.max_request_size)?;

        if let Some(url) = var("POSTGRES_URL") {
            config.database.postgres_url = url;
        }
        parse_var(&lookup, "POSTGRES_ENABLED", &mut config.database.postgres_enabled)?;
        parse_var(&lookup, "POSTGRES_MAX_CONNECTIONS", &mut config.database.max_connections)?;

        if let Some(level) = var("LOG_LEVEL") {
            config.logging.level = level;
        }
        parse_var(&lookup, "SANITIZE_LOGS", &mut config.logging.sanitize_logs)?;
        parse_var(&lookup, "LOG_REQUESTS", &mut config.logging.log_requests)?;

        parse_var(&lookup, "STOCK_EXPIRY_THRESHOLD", &mut config.moderation.stock_expiry_threshold)?;
        parse_var(&lookup, "ABUSE_REJECTION_THRESHOLD", &mut config.moderation.abuse_rejection_threshold)?;

        if let Some(admins) = var("ADMINS") {
            config.admin.admins = admins
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect();
        }

        parse_var(&lookup, "PUSH_REQUIRE_HTTPS", &mut config.push.require_https)?;
        parse_var(&lookup, "PUSH_TIMEOUT_SECS", &mut config.push.timeout_secs)?;
        parse_var(&lookup, "PUSH_TTL_SECS", &mut config.push.ttl_secs)?;
        if let Some(urgency) = var("PUSH_URGENCY") {
            config.push.urgency = urgency.trim().to_lowercase();
        }
        parse_var(&lookup, "PUSH_MAX_CONCURRENCY", &mut config.push.max_concurrency)?;
        config.push.vapid_public_key = var("VAPID_PUBLIC_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        config.push.vapid_private_key = var("VAPID_PRIVATE_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        if let Some(subject) = var("VAPID_SUBJECT") {
            config.push.vapid_subject = subject.trim().to_string();
        }

        config.validate()?;
        info!(
            host = %config.server.host,
            port = config.server.port,
            postgres = config.database.postgres_enabled,
            admins = config.admin.admins.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be non-zero"));
        }
        if self.security.rate_limit_per_minute == 0 {
            return Err(anyhow::anyhow!("Rate limit must allow at least one request per minute"));
        }
        if self.database.postgres_enabled {
            if self.database.postgres_url.trim().is_empty() {
                return Err(anyhow::anyhow!("PostgreSQL is enabled but no URL is configured"));
            }
            if self.database.max_connections == 0 {
                return Err(anyhow::anyhow!("PostgreSQL pool needs at least one connection"));
            }
        }
        if self.moderation.stock_expiry_threshold == 0 || self.moderation.abuse_rejection_threshold == 0 {
            return Err(anyhow::anyhow!("Moderation thresholds must be at least 1"));
        }
        if !URGENCIES.contains(&self.push.urgency.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid push urgency '{}', expected one of {:?}",
                self.push.urgency,
                URGENCIES
            ));
        }

        if self.push.max_concurrency == 0 {
            return Err(anyhow::anyhow!("Push concurrency must be at least 1"));
        }
        match (&self.push.vapid_public_key, &self.push.vapid_private_key) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(anyhow::anyhow!(
                    "VAPID public and private keys must be configured together"
                ));
            }
            (Some(_), Some(_)) => {
                let subject = self.push.vapid_subject.as_str();
                if !subject.starts_with("mailto:") && !subject.starts_with("https://") {
                    return Err(anyhow::anyhow!(
                        "VAPID subject must be a mailto: or https:// URI, got '{}'",
                        subject
                    ));
                }
            }
            (None, None) => warn!("No VAPID keys configured; push services will refuse alerts"),
        }

        if self.security.gateway_token.is_none() {
            if !self.admin.admins.is_empty() && !self.security.trust_identity_header {
                return Err(anyhow::anyhow!(
                    "Admins are configured but no gateway token is set; any client could claim an admin identity. \
                     Set {}GATEWAY_TOKEN or, if only the gateway can reach this service, {}TRUST_IDENTITY_HEADER=true",
                    ENV_PREFIX,
                    ENV_PREFIX
                ));
            }
            warn!("No gateway token configured; the x-user-id header is trusted as sent");
        }
        if self.admin.admins.is_empty() {
            warn!("No admins configured; admin routes will refuse every caller");
        }
        if !self.push.require_https {
            warn!("Push delivery allows plain HTTP endpoints");
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn to_thresholds(&self) -> ModerationThresholds {
        ModerationThresholds {
            stock_expiry_threshold: self.moderation.stock_expiry_threshold,
            abuse_rejection_threshold: self.moderation.abuse_rejection_threshold,
        }
    }

    pub fn to_policy(&self) -> AllowListPolicy {
        AllowListPolicy::new(&self.admin.admins)
    }

    pub fn to_transport_config(&self) -> PushTransportConfig {
        PushTransportConfig {
            require_https: self.push.require_https,
            timeout_secs: self.push.timeout_secs,
            ttl_secs: self.push.ttl_secs,
            urgency: self.push.urgency.clone(),
            vapid: match (&self.push.vapid_public_key, &self.push.vapid_private_key) {
                (Some(public_key), Some(private_key)) => Some(VapidConfig {
                    public_key: public_key.clone(),
                    private_key: private_key.clone(),
                    subject: self.push.vapid_subject.clone(),
                }),
                _ => None,
            },
            ..PushTransportConfig::default()
        }
    }

    pub fn to_security_config(&self) -> SecurityMiddlewareConfig {
        SecurityMiddlewareConfig {
            gateway_token: self.security.gateway_token.clone(),
            rate_limit_per_minute: self.security.rate_limit_per_minute,
            max_request_size: self.security.max_request_size,
            log_requests: self.logging.log_requests,
            sanitize_logs: self.logging.sanitize_logs,
            ..SecurityMiddlewareConfig::default()
        }
    }
}

/// Mask identities, keys and addresses before they reach the logs
pub fn sanitize_for_logging(value: &str, enabled: bool) -> String {
    if !enabled {
        return value.to_string();
    }

    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}
