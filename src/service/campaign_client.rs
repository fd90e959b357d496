//! Upstream campaign client.
//!
//! Sends the fixed identification payload to the campaign endpoint and
//! returns the raw JSON document. No authorization header is ever sent.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use serde::Serialize;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::error::UpstreamError;

/// User agent announced to the upstream.
pub const USER_AGENT_VALUE: &str = "Mozilla/5.0 (VoucherWatcher)";

/// Anything that can produce the raw campaign document.
#[async_trait]
pub trait CampaignSource: Send + Sync + fmt::Debug {
    /// Fetches the current campaign document.
    ///
    /// # Errors
    ///
    /// Returns an [`UpstreamError`] on transport failure, non-success
    /// status, or a body that is not JSON.
    async fn fetch_campaign(&self) -> Result<Value, UpstreamError>;
}

/// Request envelope expected by the endpoint: `{"data": {...}}`.
#[derive(Debug, Serialize)]
struct CampaignRequest<'a> {
    data: CampaignRequestData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CampaignRequestData<'a> {
    public_code: &'a str,
    ga_cid: &'a str,
    domain: &'a str,
}

/// HTTP implementation of [`CampaignSource`].
#[derive(Debug, Clone)]
pub struct CampaignClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl CampaignClient {
    /// Creates a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Transport`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: UpstreamConfig, timeout: Duration) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, config))
    }

    /// Creates a client reusing an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(http: reqwest::Client, config: UpstreamConfig) -> Self {
        Self { http, config }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let origin = self.config.storefront_origin.trim_end_matches('/');
        match HeaderValue::from_str(origin) {
            Ok(value) => {
                headers.insert(ORIGIN, value);
            }
            Err(e) => tracing::warn!(origin, error = %e, "invalid storefront origin, header omitted"),
        }
        if let Ok(value) = HeaderValue::from_str(&format!("{origin}/")) {
            headers.insert(REFERER, value);
        }
        headers
    }
}

#[async_trait]
impl CampaignSource for CampaignClient {
    async fn fetch_campaign(&self) -> Result<Value, UpstreamError> {
        let payload = CampaignRequest {
            data: CampaignRequestData {
                public_code: &self.config.campaign_public_code,
                ga_cid: &self.config.ga_cid,
                domain: &self.config.domain,
            },
        };

        let response = self
            .http
            .post(&self.config.api_url)
            .headers(self.headers())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        // An unreadable body is reported as empty; the status decides.
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(UpstreamError::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                &body,
            ));
        }

        Ok(serde_json::from_str(&body)?)
    }
}
