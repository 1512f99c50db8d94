//! The `echo://` dispatcher: POSTs the payload to the host named in the
//! URI over plain HTTP. Named for the reference implementation's "echo to
//! nowhere" test sink; here it actually performs the POST, which is what
//! makes it useful as the sink in the pass-through happy-path scenario.
//!
//! Configured as `echo://host[:port]`.

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

pub struct EchoDispatcher {
    endpoint: String,
    client: reqwest::Client,
}

impl EchoDispatcher {
    pub fn from_uri(uri: &str) -> Result<Self, ConfigError> {
        let parsed = url::Url::parse(uri).map_err(|source| ConfigError::InvalidUri {
            uri: uri.to_string(),
            source,
        })?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ConfigError::Invalid("echo:// dispatcher requires a host".to_string()))?;
        let endpoint = match parsed.port() {
            Some(port) => format!("http://{host}:{port}"),
            None => format!("http://{host}"),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| ConfigError::Invalid(format!("failed to build HTTP client: {err}")))?;

        Ok(EchoDispatcher { endpoint, client })
    }
}

#[async_trait]
impl Dispatcher for EchoDispatcher {
    async fn dispatch(&self, ctx: &CancellationToken, body: Bytes) -> Result<(), WebhookdError> {
        let send = self.client.post(&self.endpoint).header("Content-Type", "application/json").body(body).send();

        let response = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(WebhookdError::status(StatusCode::SERVICE_UNAVAILABLE, "dispatch cancelled")),
            result = send => result.map_err(WebhookdError::internal)?,
        };

        if !response.status().is_success() {
            return Err(WebhookdError::internal(format!("echo dispatcher received status {}", response.status())));
        }

        Ok(())
    }
}

pub fn new(uri: &str) -> BoxFuture<'static, Result<Arc<dyn Dispatcher>, ConfigError>> {
    let result = EchoDispatcher::from_uri(uri);
    Box::pin(async move { result.map(|d| Arc::new(d) as Arc<dyn Dispatcher>) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_body_to_configured_host() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_bytes(b"hello".to_vec()))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let uri = format!("echo://{}", server.address());
        let dispatcher = EchoDispatcher::from_uri(&uri).unwrap();
        let ctx = CancellationToken::new();

        dispatcher.dispatch(&ctx, Bytes::from_static(b"hello")).await.unwrap();
    }

    #[tokio::test]
    async fn surfaces_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(502)).mount(&server).await;

        let uri = format!("echo://{}", server.address());
        let dispatcher = EchoDispatcher::from_uri(&uri).unwrap();
        let ctx = CancellationToken::new();

        let err = dispatcher.dispatch(&ctx, Bytes::from_static(b"hello")).await.unwrap_err();
        assert!(!err.is_soft_halt());
    }
}
