//! The `passthrough://` receiver: reads the request body verbatim, with no
//! validation of its provenance. Rejects non-POST requests with 405.
//! Not suitable for production use against untrusted senders — see
//! [`super::secure`] for signature verification.

use crate::error::WebhookdError;
use crate::registry::ConfigError;
use crate::stage::Receiver;
use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use bytes::Bytes;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct PassThroughReceiver;

impl PassThroughReceiver {
    pub fn from_uri(_uri: &str) -> Result<Self, ConfigError> {
        Ok(PassThroughReceiver)
    }
}

#[async_trait]
impl Receiver for PassThroughReceiver {
    async fn receive(&self, ctx: &CancellationToken, request: Request) -> Result<Bytes, WebhookdError> {
        if ctx.is_cancelled() {
            return Err(WebhookdError::status(StatusCode::SERVICE_UNAVAILABLE, "request cancelled"));
        }

        if request.method() != Method::POST {
            return Err(WebhookdError::status(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"));
        }

        read_body(ctx, request).await
    }
}

/// Read the full request body, observing cancellation. Shared with
/// [`super::secure`], which wraps this with signature verification.
pub(super) async fn read_body(ctx: &CancellationToken, request: Request) -> Result<Bytes, WebhookdError> {
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(WebhookdError::status(StatusCode::SERVICE_UNAVAILABLE, "request cancelled")),
        result = axum::body::to_bytes(request.into_body(), usize::MAX) => {
            result.map_err(|err| WebhookdError::internal(format!("failed to read request body: {err}")))
        }
    }
}

pub fn new(uri: &str) -> BoxFuture<'static, Result<Arc<dyn Receiver>, ConfigError>> {
    let result = PassThroughReceiver::from_uri(uri);
    Box::pin(async move { result.map(|r| Arc::new(r) as Arc<dyn Receiver>) })
}
