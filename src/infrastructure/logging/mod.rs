// Logging module - tracing initialization for the binary
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system with the default filter.
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_with("seqcom=info,warn,error")
}

/// Initialize the logging system with an explicit filter, unless the
/// environment already provides one.
pub fn init_logging_with(default_filter: &str) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .try_init()?;

    Ok(())
}
