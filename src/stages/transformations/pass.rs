//! The `pass://` transformation: returns its input unaltered. Used to
//! document a no-op step in a chain, or as the identity element tested in
//! the idempotence property (feeding bytes through any prefix of a chain
//! of pass-throughs yields the same bytes).

use crate::error::WebhookdError;
use crate::registry::ConfigError;
use crate::stage::Transformation;
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct NullTransformation;

impl NullTransformation {
    pub fn from_uri(_uri: &str) -> Result<Self, ConfigError> {
        Ok(NullTransformation)
    }
}

#[async_trait]
impl Transformation for NullTransformation {
    async fn transform(&self, _ctx: &CancellationToken, body: Bytes) -> Result<Bytes, WebhookdError> {
        Ok(body)
    }
}

pub fn new(uri: &str) -> BoxFuture<'static, Result<Arc<dyn Transformation>, ConfigError>> {
    let result = NullTransformation::from_uri(uri);
    Box::pin(async move { result.map(|t| Arc::new(t) as Arc<dyn Transformation>) })
}
