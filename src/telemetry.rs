//! Telemetry initialization (A2): a `tracing-subscriber` registry with an
//! `EnvFilter`, defaulting to `info` when `RUST_LOG` is unset. No OTLP
//! export — this daemon doesn't participate in a distributed trace, so
//! there's nothing to propagate a trace context to or from.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}
