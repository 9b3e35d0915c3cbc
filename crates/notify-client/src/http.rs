//! HTTP implementation of the remote notification source
//!
//! The backend exposes three endpoints per user:
//!
//! - `GET  {base}/v1/users/{user}/notifications/pending` returns the pending set
//! - `POST {base}/v1/users/{user}/notifications/subscribe` opens a stream and returns a cursor
//! - `GET  {base}/v1/users/{user}/notifications/poll?cursor=..&wait=..` long-polls the stream
//!
//! Pending and poll responses share the body `{"notifications": [...], "cursor": "..."}`.
//! Errors use `{"error": "...", "message": "..."}`.

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, Response as ReqwestResponse, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::source::{NotificationSource, NotificationSubscription, WireRecord};
use crate::types::UserId;
use crate::{Result, SourceError};

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the HTTP notification source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiClientConfig {
    /// Base service URL (e.g., "https://api.stepzsync.com")
    pub service_url: String,
    /// Per-request timeout
    #[serde(with = "networking::duration_ms", rename = "timeoutMs")]
    pub timeout: Duration,
    /// How long the server may hold a poll open
    #[serde(with = "networking::duration_ms", rename = "longPollWaitMs")]
    pub long_poll_wait: Duration,
    /// User agent string
    pub user_agent: String,
    /// Custom headers to include in all requests
    pub default_headers: HashMap<String, String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            service_url: "https://api.stepzsync.com".to_string(),
            timeout: Duration::from_secs(30),
            long_poll_wait: Duration::from_secs(20),
            user_agent: format!("StepzSync/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
        }
    }
}

impl ApiClientConfig {
    /// Create a new config with a service URL
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the long-poll hold time
    pub fn with_long_poll_wait(mut self, wait: Duration) -> Self {
        self.long_poll_wait = wait;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Wire Bodies
// =============================================================================

/// Standard error response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code
    pub error: String,
    /// Error message
    pub message: String,
}

/// Body of pending and poll responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationBatch {
    /// Raw notification records
    #[serde(default)]
    pub notifications: Vec<WireRecord>,
    /// Cursor to resume the stream from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Body returned when a subscription is opened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeResponse {
    /// Initial stream cursor
    #[serde(default)]
    pub cursor: Option<String>,
}

// =============================================================================
// Source Implementation
// =============================================================================

/// HTTP long-poll notification source
#[derive(Debug, Clone)]
pub struct HttpNotificationSource {
    client: ReqwestClient,
    base: Url,
    config: ApiClientConfig,
}

impl HttpNotificationSource {
    /// Create a new HTTP source
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let base = Url::parse(&config.service_url)
            .map_err(|e| SourceError::InvalidUrl(format!("{}: {}", config.service_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(SourceError::InvalidUrl(config.service_url.clone()));
        }

        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, base, config })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    fn user_url(&self, user: &UserId, endpoint: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidUrl(self.config.service_url.clone()))?
            .pop_if_empty()
            .extend(["v1", "users", user.as_str(), "notifications", endpoint]);
        Ok(url)
    }

    fn with_default_headers(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }
        req
    }
}

#[async_trait]
impl NotificationSource for HttpNotificationSource {
    async fn subscribe(&self, user: &UserId) -> Result<Box<dyn NotificationSubscription>> {
        let url = self.user_url(user, "subscribe")?;
        let response = self.with_default_headers(self.client.post(url)).send().await?;
        let opened: SubscribeResponse = parse_response(response).await?;

        tracing::debug!(user = %user, cursor = ?opened.cursor, "Opened notification stream");

        Ok(Box::new(HttpSubscription {
            source: self.clone(),
            poll_url: self.user_url(user, "poll")?,
            cursor: opened.cursor,
        }))
    }

    async fn fetch_pending(&self, user: &UserId) -> Result<Vec<WireRecord>> {
        let url = self.user_url(user, "pending")?;
        let response = self.with_default_headers(self.client.get(url)).send().await?;
        let batch: NotificationBatch = parse_response(response).await?;
        Ok(batch.notifications)
    }
}

/// Long-poll subscription handle
struct HttpSubscription {
    source: HttpNotificationSource,
    poll_url: Url,
    cursor: Option<String>,
}

#[async_trait]
impl NotificationSubscription for HttpSubscription {
    async fn next_batch(&mut self) -> Result<Vec<WireRecord>> {
        let wait = self.source.config.long_poll_wait.as_secs().to_string();
        let mut req = self
            .source
            .client
            .get(self.poll_url.clone())
            .query(&[("wait", wait.as_str())]);
        if let Some(ref cursor) = self.cursor {
            req = req.query(&[("cursor", cursor.as_str())]);
        }

        let response = self.source.with_default_headers(req).send().await?;
        match response.status() {
            StatusCode::NO_CONTENT => return Ok(Vec::new()),
            StatusCode::GONE => return Err(SourceError::Closed),
            _ => {}
        }

        let batch: NotificationBatch = parse_response(response).await?;
        if batch.cursor.is_some() {
            self.cursor = batch.cursor;
        }
        Ok(batch.notifications)
    }
}

/// Parse a response body, mapping non-success statuses to API errors
async fn parse_response<T>(response: ReqwestResponse) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();

    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorResponse>(&error_body) {
            Ok(error_response) => format!("{}: {}", error_response.error, error_response.message),
            Err(_) => format!("HTTP {}: {}", status.as_u16(), error_body),
        };
        return Err(SourceError::Api { status: status.as_u16(), message });
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ApiClientConfig::default();
        assert_eq!(config.service_url, "https://api.stepzsync.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.long_poll_wait < config.timeout);
        assert!(config.user_agent.starts_with("StepzSync/"));
    }

    #[test]
    fn test_client_config_builder() {
        let config = ApiClientConfig::new("https://custom.server")
            .with_timeout(Duration::from_secs(60))
            .with_long_poll_wait(Duration::from_secs(5))
            .with_user_agent("CustomAgent/1.0")
            .with_header("Authorization", "Bearer token");

        assert_eq!(config.service_url, "https://custom.server");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.long_poll_wait, Duration::from_secs(5));
        assert_eq!(config.user_agent, "CustomAgent/1.0");
        assert_eq!(
            config.default_headers.get("Authorization"),
            Some(&"Bearer token".to_string())
        );
    }

    #[test]
    fn test_client_config_from_json() {
        let config: ApiClientConfig = serde_json::from_value(serde_json::json!({
            "serviceUrl": "https://staging.example.com",
            "timeoutMs": 5000
        }))
        .unwrap();

        assert_eq!(config.service_url, "https://staging.example.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.long_poll_wait, Duration::from_secs(20));
    }

    #[test]
    fn test_user_url_escapes_and_joins() {
        let source =
            HttpNotificationSource::new(ApiClientConfig::new("https://api.example.com/base/"))
                .unwrap();
        let url = source.user_url(&UserId::new("user 1"), "pending").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/base/v1/users/user%201/notifications/pending"
        );
    }

    #[test]
    fn test_invalid_service_url() {
        let result = HttpNotificationSource::new(ApiClientConfig::new("not a url"));
        assert!(matches!(result, Err(SourceError::InvalidUrl(_))));

        let result = HttpNotificationSource::new(ApiClientConfig::new("mailto:ops@example.com"));
        assert!(matches!(result, Err(SourceError::InvalidUrl(_))));
    }
}
