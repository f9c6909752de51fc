//! GTFS-Realtime HTTP client.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use super::RealtimeSource;
use super::error::RealtimeError;
use super::types::FeedMessage;

/// Default connect timeout.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 2;

/// Default total request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Characters of an unparseable body kept for the error message.
const BODY_EXCERPT_CHARS: usize = 500;

/// Configuration for the realtime client.
#[derive(Debug, Clone)]
pub struct RealtimeClientConfig {
    /// Feed endpoint
    pub url: String,
    /// Sent as `x-api-key`
    pub api_key: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl RealtimeClientConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Polls the `TripUpdates` endpoint.
///
/// Both timeouts are always set so one stuck poll cannot stall the refresh
/// cadence.
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    http: reqwest::Client,
    url: String,
}

impl RealtimeClient {
    pub fn new(config: RealtimeClientConfig) -> Result<Self, RealtimeError> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| RealtimeError::NotConfigured("invalid API key format".to_string()))?;
        headers.insert("x-api-key", api_key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.url,
        })
    }

    pub async fn get_feed(&self) -> Result<FeedMessage, RealtimeError> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(RealtimeError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RealtimeError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RealtimeError::Status {
                status: status.as_u16(),
                message: body.chars().take(BODY_EXCERPT_CHARS).collect(),
            });
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "realtime feed received");

        parse_feed(&body)
    }
}

impl RealtimeSource for RealtimeClient {
    async fn fetch(&self) -> Result<FeedMessage, RealtimeError> {
        self.get_feed().await
    }
}

/// Decode a feed body, keeping an excerpt of it on failure.
pub(crate) fn parse_feed(body: &str) -> Result<FeedMessage, RealtimeError> {
    serde_json::from_str(body).map_err(|e| RealtimeError::Json {
        message: e.to_string(),
        body: Some(body.chars().take(BODY_EXCERPT_CHARS).collect()),
    })
}
