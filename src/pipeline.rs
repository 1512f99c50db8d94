//! The pipeline executor (C6): the per-request orchestrator that resolves
//! a webhook binding's stages and runs receive → sequential transform →
//! concurrent dispatch, producing a bounded HTTP response.

use crate::error::WebhookdError;
use crate::webhook::Webhook;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const HEADER_TIME_TO_RECEIVE: HeaderName = HeaderName::from_static("x-webhookd-time-to-receive");
const HEADER_TIME_TO_TRANSFORM: HeaderName = HeaderName::from_static("x-webhookd-time-to-transform");
const HEADER_TIME_TO_DISPATCH: HeaderName = HeaderName::from_static("x-webhookd-time-to-dispatch");
const HEADER_TIME_TO_PROCESS: HeaderName = HeaderName::from_static("x-webhookd-time-to-process");

/// Timing samples taken across the three stages, rendered into the
/// `X-Webhookd-Time-To-*` response headers as human-readable durations.
struct Timings {
    receive: Duration,
    transform: Duration,
    dispatch: Duration,
}

impl Timings {
    fn zero() -> Self {
        Timings {
            receive: Duration::ZERO,
            transform: Duration::ZERO,
            dispatch: Duration::ZERO,
        }
    }

    fn apply_headers(&self, total: Duration, response: &mut Response) {
        let headers = response.headers_mut();
        let set = |headers: &mut axum::http::HeaderMap, name: HeaderName, value: Duration| {
            if let Ok(value) = HeaderValue::from_str(&humantime::format_duration(value).to_string()) {
                headers.insert(name, value);
            }
        };
        set(headers, HEADER_TIME_TO_RECEIVE, self.receive);
        set(headers, HEADER_TIME_TO_TRANSFORM, self.transform);
        set(headers, HEADER_TIME_TO_DISPATCH, self.dispatch);
        set(headers, HEADER_TIME_TO_PROCESS, total);
    }
}

/// Run `webhook`'s receive → transform → dispatch chain against `request`.
///
/// `parent_ctx` is the daemon-wide cancellation scope; this call derives a
/// child token, guaranteed to be cancelled before this function returns
/// (success, soft-halt, or any error path) via a drop guard, the Rust
/// analogue of the reference implementation's `defer cancel()`.
pub async fn execute(webhook: &Webhook, parent_ctx: &CancellationToken, allow_debug: bool, request: Request) -> Response {
    let ctx = parent_ctx.child_token();
    let _cancel_on_exit = scopeguard::guard(ctx.clone(), |ctx| ctx.cancel());

    let debug_requested = allow_debug
        && request
            .uri()
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).any(|(k, v)| k == "debug" && !v.is_empty()))
            .unwrap_or(false);

    let t1 = Instant::now();
    let mut timings = Timings::zero();

    let ta = Instant::now();
    let body = match webhook.receiver().receive(&ctx, request).await {
        Ok(body) => body,
        Err(err) => return terminate(err, &timings, t1.elapsed()),
    };
    timings.receive = ta.elapsed();

    let ta = Instant::now();
    let mut body = body;
    for (idx, step) in webhook.transformations().iter().enumerate() {
        match step.transform(&ctx, body).await {
            Ok(next) => body = next,
            Err(err) => {
                tracing::debug!(offset = idx, "transformation step halted the pipeline");
                timings.transform = ta.elapsed();
                return terminate(err, &timings, t1.elapsed());
            }
        }
    }
    timings.transform = ta.elapsed();

    let ta = Instant::now();
    let dispatch_errors = dispatch_all(webhook, &ctx, body.clone()).await;
    timings.dispatch = ta.elapsed();

    let total = t1.elapsed();

    if !dispatch_errors.is_empty() {
        let message = dispatch_errors.into_iter().map(|err| err.message().to_string()).collect::<Vec<_>>().join("\n\n");
        return terminate(WebhookdError::status(StatusCode::INTERNAL_SERVER_ERROR, message), &timings, total);
    }

    let mut response = success_response(debug_requested, body);
    timings.apply_headers(total, &mut response);
    response
}

/// Fan out `Dispatch` to every configured dispatcher concurrently, joining
/// on all of them before inspecting results. Soft-halt errors are logged
/// and dropped; only hard errors are collected into the returned list.
/// Collecting directly from `join_all`'s result vector (rather than a
/// separately-polled channel-draining task) establishes the happens-before
/// relation between "last dispatcher returned" and "error list inspected"
/// structurally, avoiding the latent race in the reference implementation.
async fn dispatch_all(webhook: &Webhook, ctx: &CancellationToken, body: Bytes) -> Vec<WebhookdError> {
    let futures = webhook.dispatchers().iter().enumerate().map(|(idx, dispatcher)| {
        let ctx = ctx.clone();
        let body = body.clone();
        let dispatcher = dispatcher.clone();
        async move {
            let result = dispatcher.dispatch(&ctx, body).await;
            (idx, result)
        }
    });

    let results = futures::future::join_all(futures).await;

    let mut errors = Vec::new();
    for (idx, result) in results {
        if let Err(err) = result {
            if err.is_soft_halt() {
                tracing::info!(offset = idx, "dispatch step returned soft halt");
            } else {
                tracing::error!(offset = idx, error = %err, "dispatch step failed");
                errors.push(err);
            }
        }
    }
    errors
}

/// Build the terminal response for a soft-halt or hard stage error. Timing
/// headers are still attached: per the design notes, headers are emitted
/// on any terminal state reached after routing succeeded, soft-halt
/// included.
fn terminate(err: WebhookdError, timings: &Timings, total: Duration) -> Response {
    let mut response = if err.is_soft_halt() {
        tracing::info!("pipeline stage returned non-fatal soft halt");
        StatusCode::OK.into_response()
    } else {
        tracing::warn!(status = %err.status_code(), message = %err.message(), "pipeline stage failed");
        (err.status_code(), err.message().to_string()).into_response()
    };
    timings.apply_headers(total, &mut response);
    response
}

fn success_response(debug_requested: bool, body: Bytes) -> Response {
    if debug_requested {
        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(axum::http::header::CONTENT_TYPE, "text/plain")
            .header(axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .body(Body::from(body))
            .expect("building debug echo response cannot fail");
        response.headers_mut().remove(axum::http::header::CONTENT_LENGTH);
        response
    } else {
        StatusCode::OK.into_response()
    }
}
