//! The three disjoint capability sets a pipeline is built from.
//!
//! A [`Receiver`] turns an HTTP request into a byte payload. A
//! [`Transformation`] maps one payload to another. A [`Dispatcher`] forwards
//! a payload outbound. All three carry a [`CancellationToken`] so they can
//! cooperatively exit early; none of them own state visible across requests,
//! though their constructors may capture configuration (URLs, credentials,
//! ...) read once at startup.

use crate::error::WebhookdError;
use async_trait::async_trait;
use axum::extract::Request;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

/// The first pipeline stage: consumes an HTTP request, produces a payload.
#[async_trait]
pub trait Receiver: Send + Sync {
    async fn receive(&self, ctx: &CancellationToken, request: Request) -> Result<Bytes, WebhookdError>;
}

/// A middle pipeline stage: maps a payload to another payload.
#[async_trait]
pub trait Transformation: Send + Sync {
    async fn transform(&self, ctx: &CancellationToken, body: Bytes) -> Result<Bytes, WebhookdError>;
}

/// The final pipeline stage: forwards a payload outbound.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, ctx: &CancellationToken, body: Bytes) -> Result<(), WebhookdError>;
}

/// The three stage kinds, used to key the [registry](crate::registry::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Receiver,
    Transformation,
    Dispatcher,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StageKind::Receiver => "receiver",
            StageKind::Transformation => "transformation",
            StageKind::Dispatcher => "dispatcher",
        };
        write!(f, "{label}")
    }
}
