//! Tracing subscriber setup.
//!
//! Logs go to stderr; stdout is reserved for the end-of-recording report.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{WinrecError, WinrecResult};

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `config.level`.
pub fn init_logging(config: &LoggingConfig) -> WinrecResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.level)?,
    };
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.compact().with_target(false).finish())
    };
    installed.map_err(|e| WinrecError::config(format!("Logging already initialized: {e}")))
}

fn level_filter(level: &str) -> WinrecResult<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| WinrecError::config(format!("Invalid log level '{level}': {e}")))
}
