//! Logging configuration
//!
//! Initializes tracing for the application.

/// Initializes logging with the specified level.
///
/// `RUST_LOG` takes precedence over `level` when set. Calling this more than
/// once keeps the first subscriber.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_line_number(false)
        .try_init();
}
