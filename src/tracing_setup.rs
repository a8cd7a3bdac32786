use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Install the global subscriber. `RUST_LOG` controls verbosity; requests
/// and route decisions log at debug, blocked hosts and upstream failures
/// at warn.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()?;

    Ok(())
}
