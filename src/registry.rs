//! Process-wide (or, in tests, per-instance) mapping from URI scheme to a
//! stage constructor, one table per [`StageKind`]. This is the "extension
//! without modifying the dispatch core" seam: a third-party crate can hand
//! the binary a [`Registry`] with its own schemes registered, and the
//! pipeline executor never needs to know a new scheme exists.
//!
//! The registry is an explicit value built by [`Registry::with_default_stages`]
//! and threaded through the daemon builder, rather than a set of globals
//! populated by side-effecting `init()` calls. This keeps it injectable in
//! tests and leaves the door open for schemes the core was never compiled
//! with.

use crate::error::WebhookdError;
use crate::stage::{Dispatcher, Receiver, StageKind, Transformation};
use crate::stages;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ConfigError {
    #[error("unknown {kind} scheme '{scheme}'")]
    UnknownScheme { kind: StageKind, scheme: String },

    #[error("scheme '{scheme}' already registered for {kind}")]
    DuplicateScheme { kind: StageKind, scheme: String },

    #[error("failed to parse stage URI '{uri}': {source}")]
    InvalidUri { uri: String, source: url::ParseError },

    #[error("stage URI '{uri}' has no scheme")]
    MissingScheme { uri: String },

    #[error("invalid receiver/transformation/dispatcher configuration: {0}")]
    Invalid(String),
}

type Constructor<T> = fn(&str) -> BoxFuture<'static, Result<Arc<T>, ConfigError>>;

struct SchemeTable<T: ?Sized> {
    kind: StageKind,
    constructors: HashMap<String, Constructor<T>>,
}

impl<T: ?Sized> SchemeTable<T> {
    fn new(kind: StageKind) -> Self {
        Self {
            kind,
            constructors: HashMap::new(),
        }
    }

    fn register(&mut self, scheme: &str, ctor: Constructor<T>) -> Result<(), ConfigError> {
        if self.constructors.contains_key(scheme) {
            return Err(ConfigError::DuplicateScheme {
                kind: self.kind,
                scheme: scheme.to_string(),
            });
        }
        self.constructors.insert(scheme.to_string(), ctor);
        Ok(())
    }

    async fn construct(&self, uri: &str) -> Result<Arc<T>, ConfigError> {
        let parsed = url::Url::parse(uri).map_err(|source| ConfigError::InvalidUri {
            uri: uri.to_string(),
            source,
        })?;
        let scheme = parsed.scheme();
        if scheme.is_empty() {
            return Err(ConfigError::MissingScheme { uri: uri.to_string() });
        }
        let ctor = self.constructors.get(scheme).ok_or_else(|| ConfigError::UnknownScheme {
            kind: self.kind,
            scheme: scheme.to_string(),
        })?;
        ctor(uri).await
    }

    fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.constructors.keys().cloned().collect();
        schemes.sort();
        schemes
    }
}

/// The injectable scheme registry: three independent tables, one per stage
/// kind. Safe for concurrent reads once built; registration is not
/// supported concurrently with request serving (nor needs to be — see the
/// concurrency model in the design docs).
pub struct Registry {
    receivers: SchemeTable<dyn Receiver>,
    transformations: SchemeTable<dyn Transformation>,
    dispatchers: SchemeTable<dyn Dispatcher>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::empty()
    }
}

impl Registry {
    /// An empty registry with no schemes registered. Useful for tests that
    /// want to register only the scheme(s) under test.
    pub fn empty() -> Self {
        Self {
            receivers: SchemeTable::new(StageKind::Receiver),
            transformations: SchemeTable::new(StageKind::Transformation),
            dispatchers: SchemeTable::new(StageKind::Dispatcher),
        }
    }

    /// A registry pre-populated with the stock stage library: `passthrough`
    /// and `secure` receivers; `pass` and `azure-alert` transformations;
    /// `echo`, `slack`, and `log` dispatchers.
    pub fn with_default_stages() -> Result<Self, ConfigError> {
        let mut registry = Self::empty();
        stages::register_defaults(&mut registry)?;
        Ok(registry)
    }

    pub fn register_receiver(&mut self, scheme: &str, ctor: Constructor<dyn Receiver>) -> Result<(), ConfigError> {
        self.receivers.register(scheme, ctor)
    }

    pub fn register_transformation(&mut self, scheme: &str, ctor: Constructor<dyn Transformation>) -> Result<(), ConfigError> {
        self.transformations.register(scheme, ctor)
    }

    pub fn register_dispatcher(&mut self, scheme: &str, ctor: Constructor<dyn Dispatcher>) -> Result<(), ConfigError> {
        self.dispatchers.register(scheme, ctor)
    }

    pub async fn new_receiver(&self, uri: &str) -> Result<Arc<dyn Receiver>, ConfigError> {
        self.receivers.construct(uri).await
    }

    pub async fn new_transformation(&self, uri: &str) -> Result<Arc<dyn Transformation>, ConfigError> {
        self.transformations.construct(uri).await
    }

    pub async fn new_dispatcher(&self, uri: &str) -> Result<Arc<dyn Dispatcher>, ConfigError> {
        self.dispatchers.construct(uri).await
    }

    pub fn receiver_schemes(&self) -> Vec<String> {
        self.receivers.schemes()
    }

    pub fn transformation_schemes(&self) -> Vec<String> {
        self.transformations.schemes()
    }

    pub fn dispatcher_schemes(&self) -> Vec<String> {
        self.dispatchers.schemes()
    }
}

/// Map a stage construction failure into the uniform per-request error type,
/// for contexts (none in this crate today, but kept for completeness of the
/// two error hierarchies) that need to surface a `ConfigError` mid-request.
impl From<ConfigError> for WebhookdError {
    fn from(err: ConfigError) -> Self {
        WebhookdError::internal(err)
    }
}
