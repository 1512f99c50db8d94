//! # webhookd
//!
//! A pluggable webhook router daemon. Inbound HTTP requests are received,
//! transformed, and dispatched through a chain of stages selected per
//! endpoint; which concrete stage backs each link is chosen at
//! configuration time by URI scheme (`passthrough://`, `secure://`,
//! `slack://`, ...), not by a compiled-in switch.
//!
//! ## Architecture
//!
//! A request arriving at a configured path is handled by [`pipeline::execute`]:
//! a [`stage::Receiver`] turns it into a payload, an ordered chain of
//! [`stage::Transformation`]s maps that payload forward, and the result is
//! fanned out concurrently to every configured [`stage::Dispatcher`]. Which
//! stage implementation backs a given URI scheme is resolved through a
//! [`registry::Registry`], built once at startup from the stock stage
//! library in [`stages`] and threaded through [`app::Application::new`].
//!
//! ## Quick start
//!
//! ```no_run
//! use clap::Parser;
//! use webhookd::config::{Args, RoutingConfig};
//! use webhookd::registry::Registry;
//! use webhookd::app::Application;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     webhookd::telemetry::init_telemetry()?;
//!     let args = Args::parse();
//!     let config = RoutingConfig::load(&args)?;
//!     let registry = Registry::with_default_stages()?;
//!     let app = Application::new(&config, &registry).await?;
//!     app.serve(async { tokio::signal::ctrl_c().await.expect("ctrl-c handler"); }).await
//! }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod stage;
pub mod stages;
pub mod telemetry;
pub mod webhook;

pub use app::Application;
pub use config::RoutingConfig;
pub use error::WebhookdError;
pub use registry::Registry;
