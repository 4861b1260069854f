// Logging module - tracing setup
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system.
///
/// Logs go to stderr so they never interleave with device traffic on stdout.
pub fn init_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_filter = if verbose { "comterm=debug" } else { "comterm=info,warn,error" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .init();

    Ok(())
}
