//! Configuration model (C4) and the ambient CLI/loading machinery (A1)
//! layered on top of it.
//!
//! Configuration is loaded from a YAML file, merged with `WEBHOOKD_`
//! prefixed environment variable overrides, via a two-source `figment`
//! stack (`Yaml::file` then `Env::prefixed`).

use crate::registry::ConfigError;
use clap::Parser;
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::Deserialize;
use std::collections::HashMap;

/// Command-line arguments: just enough to locate and validate configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "A pluggable webhook router daemon", long_about = None)]
pub struct Args {
    /// Path to the YAML configuration document.
    #[arg(short = 'f', long, env = "WEBHOOKD_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// One endpoint binding as declared in configuration: labels referencing
/// the `receivers`/`transformations`/`dispatchers` maps, not yet resolved
/// to stage instances.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookEntry {
    pub endpoint: String,
    pub receiver: String,
    #[serde(default)]
    pub transformations: Vec<String>,
    pub dispatchers: Vec<String>,
}

/// The root configuration document: the three label→URI maps plus the
/// ordered webhook bindings and the daemon listener URI.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    #[serde(default)]
    pub receivers: HashMap<String, String>,
    #[serde(default)]
    pub transformations: HashMap<String, String>,
    #[serde(default)]
    pub dispatchers: HashMap<String, String>,
    #[serde(default)]
    pub webhooks: Vec<WebhookEntry>,
    pub daemon: String,
}

impl RoutingConfig {
    /// Load configuration from `args.config`, with `WEBHOOKD_`-prefixed
    /// environment variables overriding any matching key.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let config: RoutingConfig = Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("WEBHOOKD_").split("__"))
            .extract()
            .map_err(|err| ConfigError::Invalid(format!("failed to load configuration from '{}': {err}", args.config)))?;

        config.validate()?;
        Ok(config)
    }

    /// Structural validation that doesn't require resolving stage URIs
    /// through a registry: non-empty fields, referenced labels exist,
    /// no duplicate endpoints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen_endpoints = std::collections::HashSet::new();

        for (idx, hook) in self.webhooks.iter().enumerate() {
            if hook.endpoint.is_empty() {
                return Err(ConfigError::Invalid(format!("missing endpoint at offset {}", idx + 1)));
            }
            if !hook.endpoint.starts_with('/') {
                return Err(ConfigError::Invalid(format!("endpoint '{}' must start with '/'", hook.endpoint)));
            }
            if !seen_endpoints.insert(hook.endpoint.clone()) {
                return Err(ConfigError::Invalid(format!("duplicate endpoint '{}'", hook.endpoint)));
            }
            if hook.receiver.is_empty() {
                return Err(ConfigError::Invalid(format!("missing receiver at offset {}", idx + 1)));
            }
            if hook.dispatchers.is_empty() {
                return Err(ConfigError::Invalid(format!("missing dispatchers at offset {}", idx + 1)));
            }

            self.receiver_uri(&hook.receiver)?;
            for name in hook.transformations.iter().filter(|n| !n.starts_with('#')) {
                self.transformation_uri(name)?;
            }
            for name in hook.dispatchers.iter().filter(|n| !n.starts_with('#')) {
                self.dispatcher_uri(name)?;
            }
        }

        Ok(())
    }

    pub fn receiver_uri(&self, label: &str) -> Result<&str, ConfigError> {
        self.receivers
            .get(label)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::Invalid(format!("invalid receiver name '{label}'")))
    }

    pub fn transformation_uri(&self, label: &str) -> Result<&str, ConfigError> {
        self.transformations
            .get(label)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::Invalid(format!("invalid transformation name '{label}'")))
    }

    pub fn dispatcher_uri(&self, label: &str) -> Result<&str, ConfigError> {
        self.dispatchers
            .get(label)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::Invalid(format!("invalid dispatcher name '{label}'")))
    }
}

/// Listener configuration parsed out of the `daemon` URI: host, port, the
/// `allow_debug` query parameter, and an optional bearer token that, if
/// present, gates every request behind an `Authorization: Bearer <token>`
/// check before routing (§4.7's "optional middleware slot").
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub host: String,
    pub port: u16,
    pub allow_debug: bool,
    pub auth_token: Option<String>,
}

impl DaemonConfig {
    pub fn from_uri(uri: &str) -> Result<Self, ConfigError> {
        let parsed = url::Url::parse(uri).map_err(|source| ConfigError::InvalidUri {
            uri: uri.to_string(),
            source,
        })?;

        let host = parsed.host_str().unwrap_or("0.0.0.0").to_string();
        let port = parsed.port().unwrap_or(8080);

        let allow_debug = parsed
            .query_pairs()
            .find(|(k, _)| k == "allow_debug")
            .map(|(_, v)| v.parse::<bool>())
            .transpose()
            .map_err(|err| ConfigError::Invalid(format!("invalid ?allow_debug parameter: {err}")))?
            .unwrap_or(false);

        let auth_token = parsed
            .query_pairs()
            .find(|(k, _)| k == "auth_token")
            .map(|(_, v)| v.into_owned())
            .filter(|token| !token.is_empty());

        Ok(DaemonConfig {
            host,
            port,
            allow_debug,
            auth_token,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
