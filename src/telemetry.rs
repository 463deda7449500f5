//! Tracing subscriber installation for controller processes.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Errors returned while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The fallback filter directive could not be parsed.
    #[error("invalid tracing filter '{directive}': {reason}")]
    InvalidFilter {
        /// Directive that failed to parse.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Installs a compact fmt subscriber filtered by `RUST_LOG`.
///
/// Events are written to stderr; agent processes use stdout as their
/// protocol channel.
///
/// `default_directive` applies when `RUST_LOG` is unset or unparsable, for
/// example `"info,agentgate=debug"`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when `default_directive` is not
/// a valid filter, or [`TelemetryError::AlreadyInstalled`] when another
/// global subscriber is already active.
pub fn init_tracing(default_directive: &str) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive).map_err(|err| {
            TelemetryError::InvalidFilter {
                directive: default_directive.to_owned(),
                reason: err.to_string(),
            }
        })?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInstalled(err.to_string()))
}
