//! The `slack://` dispatcher: posts the payload to a Slack incoming
//! webhook. Configured as:
//!
//!     slack://?webhook=<url-encoded incoming-webhook URL>&channel=<name>
//!
//! `channel` is informational only (Slack incoming webhooks are already
//! bound to a channel at creation time) but is kept for compatibility with
//! the reference implementation's URI shape, and is logged on send.

use crate::error::WebhookdError;
use crate::registry::ConfigError;
use crate::stage::Dispatcher;
use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct SlackDispatcher {
    webhook_url: String,
    channel: Option<String>,
    client: reqwest::Client,
}

impl SlackDispatcher {
    pub fn from_uri(uri: &str) -> Result<Self, ConfigError> {
        let parsed = url::Url::parse(uri).map_err(|source| ConfigError::InvalidUri {
            uri: uri.to_string(),
            source,
        })?;
        let query: std::collections::HashMap<String, String> = parsed.query_pairs().into_owned().collect();

        let webhook_url = query
            .get("webhook")
            .cloned()
            .ok_or_else(|| ConfigError::Invalid("slack:// dispatcher requires a 'webhook' query parameter".to_string()))?;
        let channel = query.get("channel").cloned();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| ConfigError::Invalid(format!("failed to build HTTP client: {err}")))?;

        Ok(SlackDispatcher { webhook_url, channel, client })
    }
}

#[async_trait]
impl Dispatcher for SlackDispatcher {
    async fn dispatch(&self, ctx: &CancellationToken, body: Bytes) -> Result<(), WebhookdError> {
        if let Some(channel) = &self.channel {
            tracing::debug!(channel = %channel, "dispatching to slack");
        }

        let send = self
            .client
            .post(&self.webhook_url)
            .header("Content-Type", "application/json")
            .body(body)
            .send();

        let response = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(WebhookdError::status(StatusCode::SERVICE_UNAVAILABLE, "dispatch cancelled")),
            result = send => result.map_err(WebhookdError::internal)?,
        };

        if !response.status().is_success() {
            return Err(WebhookdError::internal(format!("slack webhook responded with status {}", response.status())));
        }

        Ok(())
    }
}

pub fn new(uri: &str) -> BoxFuture<'static, Result<Arc<dyn Dispatcher>, ConfigError>> {
    let result = SlackDispatcher::from_uri(uri);
    Box::pin(async move { result.map(|d| Arc::new(d) as Arc<dyn Dispatcher>) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_webhook_param() {
        let err = SlackDispatcher::from_uri("slack://?channel=ops").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn parses_webhook_and_channel() {
        let dispatcher = SlackDispatcher::from_uri("slack://?webhook=https%3A%2F%2Fhooks.example%2Fabc&channel=ops").unwrap();
        assert_eq!(dispatcher.webhook_url, "https://hooks.example/abc");
        assert_eq!(dispatcher.channel.as_deref(), Some("ops"));
    }
}
