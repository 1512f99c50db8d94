//! The `secure://` receiver: like [`passthrough`](super::passthrough), but
//! verifies an HMAC-SHA256 signature over the body before accepting it —
//! the shape most source-control webhook producers (GitHub, GitLab, ...)
//! use to prove a request actually came from them.
//!
//! Configured as:
//!
//!     secure://?secret=<shared-secret>&header=X-Hub-Signature-256
//!
//! `header` defaults to `X-Hub-Signature-256`. The header value is expected
//! in `sha256=<hex>` form. A missing or mismatched signature is a 401.

use crate::error::WebhookdError;
use crate::registry::ConfigError;
use crate::stage::Receiver;
use crate::stages::receivers::passthrough::read_body;
use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use bytes::Bytes;
use futures::future::BoxFuture;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

pub struct SecureReceiver {
    secret: String,
    header: String,
}

impl SecureReceiver {
    pub fn from_uri(uri: &str) -> Result<Self, ConfigError> {
        let parsed = url::Url::parse(uri).map_err(|source| ConfigError::InvalidUri {
            uri: uri.to_string(),
            source,
        })?;
        let query: std::collections::HashMap<String, String> = parsed.query_pairs().into_owned().collect();

        let secret = query
            .get("secret")
            .cloned()
            .ok_or_else(|| ConfigError::Invalid("secure:// receiver requires a 'secret' query parameter".to_string()))?;
        let header = query.get("header").cloned().unwrap_or_else(|| DEFAULT_SIGNATURE_HEADER.to_string());

        Ok(SecureReceiver { secret, header })
    }

    fn verify(&self, signature_header: &str, body: &[u8]) -> bool {
        let Some(hex_sig) = signature_header.strip_prefix("sha256=") else {
            return false;
        };
        let Ok(expected) = hex::decode(hex_sig) else {
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(self.secret.as_bytes()) else {
            return false;
        };
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }
}

#[async_trait]
impl Receiver for SecureReceiver {
    async fn receive(&self, ctx: &CancellationToken, request: Request) -> Result<Bytes, WebhookdError> {
        if ctx.is_cancelled() {
            return Err(WebhookdError::status(StatusCode::SERVICE_UNAVAILABLE, "request cancelled"));
        }

        if request.method() != Method::POST {
            return Err(WebhookdError::status(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"));
        }

        let signature = request
            .headers()
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = read_body(ctx, request).await?;

        match signature {
            Some(sig) if self.verify(&sig, &body) => Ok(body),
            _ => Err(WebhookdError::status(StatusCode::UNAUTHORIZED, "Invalid or missing signature")),
        }
    }
}

pub fn new(uri: &str) -> BoxFuture<'static, Result<Arc<dyn Receiver>, ConfigError>> {
    let result = SecureReceiver::from_uri(uri);
    Box::pin(async move { result.map(|r| Arc::new(r) as Arc<dyn Receiver>) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let bytes = mac.finalize().into_bytes();
        format!("sha256={}", bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
    }

    #[tokio::test]
    async fn accepts_valid_signature() {
        let receiver = SecureReceiver::from_uri("secure://?secret=topsecret").unwrap();
        let ctx = CancellationToken::new();
        let body = b"payload-bytes";
        let signature = sign("topsecret", body);

        let request = Request::post("/")
            .header(DEFAULT_SIGNATURE_HEADER, signature)
            .body(Body::from(&body[..]))
            .unwrap();

        let out = receiver.receive(&ctx, request).await.unwrap();
        assert_eq!(&out[..], body);
    }

    #[tokio::test]
    async fn rejects_missing_signature() {
        let receiver = SecureReceiver::from_uri("secure://?secret=topsecret").unwrap();
        let ctx = CancellationToken::new();
        let request = Request::post("/").body(Body::from("payload")).unwrap();

        let err = receiver.receive(&ctx, request).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_wrong_signature() {
        let receiver = SecureReceiver::from_uri("secure://?secret=topsecret").unwrap();
        let ctx = CancellationToken::new();
        let request = Request::post("/")
            .header(DEFAULT_SIGNATURE_HEADER, "sha256=deadbeef")
            .body(Body::from("payload"))
            .unwrap();

        let err = receiver.receive(&ctx, request).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn requires_secret_param() {
        let err = SecureReceiver::from_uri("secure://").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
