//! Logging initialization.
//!
//! Configures the `tracing` subscriber. The `CRAFTBOT_LOG` environment variable
//! takes precedence; otherwise the `[logging].level` from the config file is
//! used.
//!
//! ```bash
//! # Debug level for everything
//! CRAFTBOT_LOG=debug craftbot run
//!
//! # Only RCON traffic at trace level
//! CRAFTBOT_LOG=craftbot_rcon=trace,info craftbot run
//! ```

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::schema::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "CRAFTBOT_LOG";

/// Build the filter: `CRAFTBOT_LOG` if set and valid, else `fallback`.
pub fn filter(fallback: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback.as_directive()))
}

/// Install the global subscriber, writing to stderr.
///
/// Does nothing if a subscriber is already installed, so it is safe to call
/// from tests and after a re-exec.
pub fn init(fallback: LogLevel) {
    let _ = fmt()
        .with_env_filter(filter(fallback))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
