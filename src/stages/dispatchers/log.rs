//! The `log://` dispatcher: writes the payload to the structured log at
//! info level and nothing else. Useful for smoke-testing a binding's
//! receiver/transformation chain without standing up a real sink — the
//! webhook-binding test in the reference implementation uses exactly this
//! scheme for that purpose.

use crate::error::WebhookdError;
use crate::registry::ConfigError;
use crate::stage::Dispatcher;
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct LogDispatcher;

impl LogDispatcher {
    pub fn from_uri(_uri: &str) -> Result<Self, ConfigError> {
        Ok(LogDispatcher)
    }
}

#[async_trait]
impl Dispatcher for LogDispatcher {
    async fn dispatch(&self, _ctx: &CancellationToken, body: Bytes) -> Result<(), WebhookdError> {
        tracing::info!(bytes = body.len(), body = %String::from_utf8_lossy(&body), "log dispatcher received payload");
        Ok(())
    }
}

pub fn new(uri: &str) -> BoxFuture<'static, Result<Arc<dyn Dispatcher>, ConfigError>> {
    let result = LogDispatcher::from_uri(uri);
    Box::pin(async move { result.map(|d| Arc::new(d) as Arc<dyn Dispatcher>) })
}
