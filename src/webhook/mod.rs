//! Workflow Webhook
//!
//! Tells the downstream workflow engine that an uploaded file has been
//! ingested: `POST {base}/webhook/match-start?key={secret}` with body
//! `{"s3_key": "<object key>"}`.
//!
//! Delivery is fire-and-forget. Failures are logged and never reach the
//! caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};
use url::Url;

use crate::config::WebhookConfig;
use crate::types::{AppError, AppResult};

const MATCH_START_PATH: &str = "webhook/match-start";

/// What happened to a single notification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Base URL or key not configured; no request was made.
    Skipped,
    /// The endpoint answered with a 2xx status.
    Delivered(u16),
    /// The endpoint answered with a non-2xx status.
    Rejected(u16),
    /// The request did not complete (timeout, connection error, ...).
    Failed,
}

#[async_trait]
pub trait UploadNotifier: Send + Sync {
    async fn notify_upload(&self, s3_key: &str) -> WebhookOutcome;
}

#[derive(Serialize)]
struct MatchStartPayload<'a> {
    s3_key: &'a str,
}

pub struct WebhookNotifier {
    client: Client,
    endpoint: Option<Url>,
}

impl WebhookNotifier {
    pub fn from_config(config: &WebhookConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build webhook client: {}", e)))?;

        let endpoint = match (&config.base_url, &config.key) {
            (Some(base_url), Some(key)) => Some(Self::endpoint(base_url, key)?),
            _ => None,
        };

        Ok(Self { client, endpoint })
    }

    fn endpoint(base_url: &str, key: &str) -> AppResult<Url> {
        let mut url = Url::parse(&format!("{}/{}", base_url.trim_end_matches('/'), MATCH_START_PATH))
            .map_err(|e| AppError::Config(format!("invalid N8N_WEBHOOK_BASE_URL {:?}: {}", base_url, e)))?;
        url.query_pairs_mut().append_pair("key", key);
        Ok(url)
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}

#[async_trait]
impl UploadNotifier for WebhookNotifier {
    async fn notify_upload(&self, s3_key: &str) -> WebhookOutcome {
        let Some(endpoint) = &self.endpoint else {
            warn!("Webhook not configured; skipping webhook call");
            return WebhookOutcome::Skipped;
        };

        let result = self
            .client
            .post(endpoint.clone())
            .json(&MatchStartPayload { s3_key })
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                info!(s3_key, status = status.as_u16(), "Webhook response");
                if status.is_success() {
                    WebhookOutcome::Delivered(status.as_u16())
                } else {
                    WebhookOutcome::Rejected(status.as_u16())
                }
            }
            Err(e) => {
                error!(s3_key, error = %e, "Failed to call webhook");
                WebhookOutcome::Failed
            }
        }
    }
}
