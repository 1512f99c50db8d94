//! Daemon assembly (C7): wiring [`RoutingConfig`] and a [`Registry`] into a
//! set of resolved [`Webhook`] bindings, an [`axum::Router`], and a
//! [`tokio::net::TcpListener`]. Construction (`Application::new`) and
//! serving (`Application::serve`) are kept as separate steps so tests can
//! build an `Application` and exercise its router without binding a socket.

use crate::config::{DaemonConfig, RoutingConfig};
use crate::pipeline;
use crate::registry::{ConfigError, Registry};
use crate::webhook::Webhook;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

/// Resolved routing table plus the daemon-wide cancellation scope every
/// request's child token descends from.
#[derive(Clone)]
struct AppState {
    bindings: Arc<HashMap<String, Webhook>>,
    shutdown: CancellationToken,
    allow_debug: bool,
}

/// The assembled daemon: a bound listener and a router ready to serve.
/// Built once at startup from a [`RoutingConfig`] and a [`Registry`];
/// [`Application::serve`] consumes it.
pub struct Application {
    listener: TcpListener,
    router: Router,
    bind_address: String,
}

impl Application {
    /// Resolve every configured webhook binding against `registry`, bind
    /// the daemon's listen address, and build the router. Returns an error
    /// if any configured scheme is unregistered or a bind fails.
    pub async fn new(config: &RoutingConfig, registry: &Registry) -> anyhow::Result<Self> {
        let daemon = DaemonConfig::from_uri(&config.daemon)?;

        let mut bindings = HashMap::new();
        for entry in &config.webhooks {
            let receiver = registry.new_receiver(config.receiver_uri(&entry.receiver)?).await?;

            let mut transformations = Vec::with_capacity(entry.transformations.len());
            for name in entry.transformations.iter().filter(|n| !n.starts_with('#')) {
                transformations.push(registry.new_transformation(config.transformation_uri(name)?).await?);
            }

            let mut dispatchers = Vec::with_capacity(entry.dispatchers.len());
            for name in entry.dispatchers.iter().filter(|n| !n.starts_with('#')) {
                dispatchers.push(registry.new_dispatcher(config.dispatcher_uri(name)?).await?);
            }

            let webhook = Webhook::new(entry.endpoint.clone(), receiver, transformations, dispatchers)?;
            if bindings.insert(webhook.endpoint().to_string(), webhook).is_some() {
                return Err(ConfigError::Invalid(format!("duplicate endpoint '{}'", entry.endpoint)).into());
            }
        }

        let state = AppState {
            bindings: Arc::new(bindings),
            shutdown: CancellationToken::new(),
            allow_debug: daemon.allow_debug,
        };

        let router = build_router(state, daemon.auth_token.clone());
        let listener = TcpListener::bind(daemon.bind_address()).await?;

        Ok(Application {
            listener,
            router,
            bind_address: daemon.bind_address(),
        })
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    /// Serve until `shutdown` resolves, then let in-flight requests drain.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        info!(address = %self.bind_address, "webhookd listening");
        axum::serve(self.listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

fn build_router(state: AppState, auth_token: Option<String>) -> Router {
    let router = Router::new().fallback(any(route_request)).with_state(state);

    let router = match auth_token {
        Some(token) => router.layer(middleware::from_fn(move |request: Request, next: Next| {
            let token = token.clone();
            async move { bearer_auth(token, request, next).await }
        })),
        None => router,
    };

    router.layer(CorsLayer::permissive()).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// Reject requests lacking a matching `Authorization: Bearer <token>`
/// header with 401, before the request ever reaches routing. Kept outside
/// of any receiver, per the design note that authorization is orthogonal
/// to stage selection.
async fn bearer_auth(token: String, request: Request, next: Next) -> Response {
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(value) if value == token => next.run(request).await,
        _ => (StatusCode::UNAUTHORIZED, "missing or invalid bearer token").into_response(),
    }
}

/// Look up the binding for `request`'s path and run it through the
/// pipeline executor, or 404 if nothing is bound to this path.
async fn route_request(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    match state.bindings.get(&path) {
        Some(webhook) => pipeline::execute(webhook, &state.shutdown, state.allow_debug, request).await,
        None => (StatusCode::NOT_FOUND, "no webhook bound to this path").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{Dispatcher, Receiver, Transformation};
    use crate::stages::dispatchers::log::LogDispatcher;
    use crate::stages::receivers::passthrough::PassThroughReceiver;
    use crate::stages::transformations::pass::NullTransformation;
    use axum::body::Body;
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state_with(bindings: HashMap<String, Webhook>, allow_debug: bool) -> AppState {
        AppState {
            bindings: Arc::new(bindings),
            shutdown: CancellationToken::new(),
            allow_debug,
        }
    }

    fn passthrough_log_webhook(endpoint: &str) -> Webhook {
        let receiver: Arc<dyn Receiver> = Arc::new(PassThroughReceiver::from_uri("passthrough://").unwrap());
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(LogDispatcher::from_uri("log://").unwrap());
        Webhook::new(endpoint, receiver, vec![], vec![dispatcher]).unwrap()
    }

    #[tokio::test]
    async fn happy_path_dispatches_and_returns_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

        let receiver: Arc<dyn Receiver> = Arc::new(PassThroughReceiver::from_uri("passthrough://").unwrap());
        let transformation: Arc<dyn Transformation> = Arc::new(NullTransformation::from_uri("pass://").unwrap());
        let dispatcher: Arc<dyn Dispatcher> =
            Arc::new(crate::stages::dispatchers::echo::EchoDispatcher::from_uri(&format!("echo://{}", server.address())).unwrap());
        let webhook = Webhook::new("/hooks/in", receiver, vec![transformation], vec![dispatcher]).unwrap();

        let router = build_router(state_with(HashMap::from([("/hooks/in".to_string(), webhook)]), false), None);
        let request = Request::post("/hooks/in").body(Body::from("payload")).unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unmatched_path_is_404() {
        let router = build_router(state_with(HashMap::from([("/hooks/in".to_string(), passthrough_log_webhook("/hooks/in"))]), false), None);
        let request = Request::post("/not-bound").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn receiver_rejection_short_circuits_before_dispatch() {
        let router = build_router(state_with(HashMap::from([("/hooks/in".to_string(), passthrough_log_webhook("/hooks/in"))]), false), None);
        let request = Request::get("/hooks/in").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn debug_echo_returns_body_when_allowed() {
        let router = build_router(state_with(HashMap::from([("/hooks/in".to_string(), passthrough_log_webhook("/hooks/in"))]), true), None);
        let request = Request::post("/hooks/in?debug=1").body(Body::from("echo me")).unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"echo me");
    }

    #[tokio::test]
    async fn debug_echo_ignored_when_daemon_disallows_it() {
        let router = build_router(state_with(HashMap::from([("/hooks/in".to_string(), passthrough_log_webhook("/hooks/in"))]), false), None);
        let request = Request::post("/hooks/in?debug=1").body(Body::from("echo me")).unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn bearer_auth_rejects_missing_token() {
        let bindings = HashMap::from([("/hooks/in".to_string(), passthrough_log_webhook("/hooks/in"))]);
        let router = build_router(state_with(bindings, false), Some("s3cr3t".to_string()));
        let request = Request::post("/hooks/in").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bearer_auth_accepts_matching_token() {
        let bindings = HashMap::from([("/hooks/in".to_string(), passthrough_log_webhook("/hooks/in"))]);
        let router = build_router(state_with(bindings, false), Some("s3cr3t".to_string()));
        let request = Request::post("/hooks/in")
            .header(header::AUTHORIZATION, "Bearer s3cr3t")
            .body(Body::from("hi"))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
