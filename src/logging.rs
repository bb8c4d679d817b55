//! Logging configuration using tracing
//!
//! Provides structured logging to stderr and, optionally, a log file, with
//! support for the RUST_LOG environment variable.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the tracing subscriber
///
/// Sets up structured logging with:
/// - Filtering via RUST_LOG environment variable (defaults to "info")
/// - Formatted output to stderr
/// - Plain, uncolored output appended to `log_file` when one is given
///
/// # Example RUST_LOG values
/// - `RUST_LOG=debug` - Show every lookup and queued command
/// - `RUST_LOG=nirvana=trace` - Trace level for the nirvana crate only
/// - `RUST_LOG=nirvana::sync=debug,info` - Debug output for the reconciler
///
/// # Errors
/// Returns an error if the log file cannot be opened or the subscriber has
/// already been initialized
pub fn init(log_file: Option<&Path>) -> crate::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::NirvanaError::Other(format!("Failed to initialize tracing: {}", e)))?;

    Ok(())
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init(None);
}
