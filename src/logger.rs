//! Logging initialisation via tracing-subscriber.
//!
//! Call [`init`] once at startup. `RUST_LOG` always wins when set; the
//! configured level is the fallback.

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Initialise the global tracing subscriber, writing to stderr.
///
/// `level` accepts standard filter strings: `"error"`, `"warn"`, `"info"`,
/// `"debug"`, `"trace"`, or any `EnvFilter` directive.
pub fn init(level: &str) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}
