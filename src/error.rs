//! Uniform failure carrier shared by every pipeline stage.
//!
//! A stage's only way to fail is to return a [`WebhookdError`]. The type
//! doubles as an HTTP status carrier the way the original Go implementation
//! overloaded a numeric `code`, but is expressed here as a tagged enum per
//! the design notes: a stage either signals a [soft halt](WebhookdError::SoftHalt)
//! (stop the pipeline, respond 200, no body) or a hard status with a message.

use axum::http::StatusCode;
use thiserror::Error as ThisError;

/// The outcome of a failed stage invocation.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum WebhookdError {
    /// Stop the pipeline successfully. No further stage runs; the response
    /// is 200 with an empty body. Used for events a stage deliberately
    /// ignores (a ping/handshake payload, for example).
    #[error("soft halt")]
    SoftHalt,

    /// Stop the pipeline and surface `code` as the HTTP response status,
    /// with `message` as the response body.
    #[error("{message}")]
    Status { code: StatusCode, message: String },
}

impl WebhookdError {
    /// Construct a hard status error.
    pub fn status(code: StatusCode, message: impl Into<String>) -> Self {
        WebhookdError::Status {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for a 500 wrapping an arbitrary error's `Display`.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        WebhookdError::status(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }

    /// Whether this error is a soft halt, i.e. the pipeline should stop
    /// and respond 200 rather than surfacing a failure.
    pub fn is_soft_halt(&self) -> bool {
        matches!(self, WebhookdError::SoftHalt)
    }

    /// The HTTP status this error maps to. Soft halts map to 200, since
    /// they are a successful (if early) termination of the pipeline.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookdError::SoftHalt => StatusCode::OK,
            WebhookdError::Status { code, .. } => *code,
        }
    }

    /// The response body message. Empty for soft halts.
    pub fn message(&self) -> &str {
        match self {
            WebhookdError::SoftHalt => "",
            WebhookdError::Status { message, .. } => message,
        }
    }
}
