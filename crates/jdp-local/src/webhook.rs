//! "Request a definition" webhook.
//!
//! The backend is a spreadsheet script that answers
//! `{"success": bool, "message"?, "error"?, "row"?}`.

use crate::config::Settings;
use jdp_core::{DefinitionRequest, Error, RequestReceipt, RequestSink, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_SOURCE: &str = "jdp_cli";

/// Build a request stamped with the current UTC time.
pub fn new_request(
    term: impl Into<String>,
    page_url: impl Into<String>,
    source: impl Into<String>,
) -> DefinitionRequest {
    DefinitionRequest {
        term: term.into(),
        page_url: page_url.into(),
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        source: source.into(),
    }
}

#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    endpoint: String,
    access_key: Option<String>,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct WebhookBody<'a> {
    #[serde(flatten)]
    request: &'a DefinitionRequest,
    referrer: &'a str,
    user_agent: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct WebhookReply {
    success: Option<bool>,
    message: Option<String>,
    error: Option<String>,
    row: Option<u64>,
}

impl WebhookSink {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        let u = url::Url::parse(&endpoint).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        if !matches!(u.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "unsupported scheme for webhook: {}",
                u.scheme()
            )));
        }
        Ok(Self {
            client,
            endpoint,
            access_key: None,
            timeout_ms: crate::config::DEFAULT_WEBHOOK_TIMEOUT_MS,
        })
    }

    pub fn from_settings(client: reqwest::Client, settings: &Settings) -> Result<Self> {
        if !settings.webhook_enabled {
            return Err(Error::NotConfigured(
                "webhook is disabled (JDP_WEBHOOK_ENABLED)".to_string(),
            ));
        }
        let Some(endpoint) = settings.webhook_url.clone() else {
            return Err(Error::NotConfigured(
                "no webhook endpoint (set JDP_WEBHOOK_URL)".to_string(),
            ));
        };
        let mut sink = Self::new(client, endpoint)?;
        sink.access_key = settings.webhook_access_key.clone();
        sink.timeout_ms = settings.webhook_timeout_ms;
        Ok(sink)
    }

    pub fn with_access_key(mut self, key: impl Into<String>) -> Self {
        self.access_key = Some(key.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl RequestSink for WebhookSink {
    async fn submit(&self, req: &DefinitionRequest) -> Result<RequestReceipt> {
        let body = WebhookBody {
            request: req,
            referrer: &req.page_url,
            user_agent: concat!("jdp/", env!("CARGO_PKG_VERSION")),
            access_key: self.access_key.as_deref(),
        };
        tracing::debug!(term = %req.term, endpoint = %self.endpoint, "submitting definition request");
        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| Error::Webhook(e.to_string()))?;
        let status = resp.status();
        let bytes = crate::read_body_capped(resp, crate::MAX_RESPONSE_BYTES, Error::Webhook).await?;
        // Non-JSON bodies are tolerated on 2xx.
        let reply: Option<WebhookReply> = serde_json::from_slice(&bytes).ok();

        if !status.is_success() {
            let msg = reply
                .and_then(|r| r.error)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(Error::Webhook(msg));
        }
        match reply {
            Some(r) if r.success == Some(false) => Err(Error::Webhook(
                r.error.unwrap_or_else(|| "request rejected".to_string()),
            )),
            Some(r) => Ok(RequestReceipt {
                message: r.message,
                row: r.row,
            }),
            None => Ok(RequestReceipt {
                message: None,
                row: None,
            }),
        }
    }
}
