//! HTTP client for the marketplace API

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::identity::USER_ID_HEADER;
use crate::api::middleware::GATEWAY_TOKEN_HEADER;
use crate::models::{FavoriteToggle, StockReportOutcome, StockStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Shared secret for deployments where the API verifies identities
    #[serde(default)]
    pub gateway_token: Option<String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 15,
            gateway_token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct VoteResponse {
    votes_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiClientConfig,
    http_client: Client,
    user_id: Option<String>,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("dealboard-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
            user_id: None,
        })
    }

    /// Identify as `user_id` on every request
    pub fn as_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.http_client.post(self.url(path));
        if let Some(user_id) = &self.user_id {
            request = request.header(USER_ID_HEADER, user_id);
        }
        if let Some(token) = &self.config.gateway_token {
            request = request.header(GATEWAY_TOKEN_HEADER, token);
        }
        request
    }

    async fn expect_success(resp: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("Unknown").to_string(),
        };
        if status == StatusCode::UNAUTHORIZED {
            warn!("{} requires a signed-in user", action);
        }
        Err(anyhow::anyhow!("{} failed with status {}: {}", action, status.as_u16(), message))
    }

    /// Returns the server's vote count
    pub async fn vote(&self, offer_id: Uuid) -> Result<i64> {
        let resp = self
            .post(&format!("/offers/{}/vote", offer_id))
            .send()
            .await
            .context("Failed to send vote")?;

        let resp = Self::expect_success(resp, "Vote").await?;
        let body: VoteResponse = resp.json().await.context("Failed to parse vote response")?;
        debug!(offer_id = %offer_id, votes = body.votes_count, "Vote confirmed");
        Ok(body.votes_count)
    }

    /// Returns whether the offer is now a favorite
    pub async fn toggle_favorite(&self, offer_id: Uuid) -> Result<bool> {
        let resp = self
            .post(&format!("/offers/{}/favorite", offer_id))
            .send()
            .await
            .context("Failed to toggle favorite")?;

        let resp = Self::expect_success(resp, "Favorite").await?;
        let toggle: FavoriteToggle = resp.json().await.context("Failed to parse favorite response")?;
        Ok(toggle.added)
    }

    pub async fn report_stock(&self, offer_id: Uuid, status: StockStatus) -> Result<StockReportOutcome> {
        let resp = self
            .post(&format!("/offers/{}/stock-reports", offer_id))
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .context("Failed to send stock report")?;

        let resp = Self::expect_success(resp, "Stock report").await?;
        resp.json().await.context("Failed to parse stock report response")
    }
}
