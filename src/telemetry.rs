//! Process-wide `tracing` subscriber setup.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The fallback filter directive does not parse.
    #[error("invalid log filter directive '{directive}': {source}")]
    InvalidDirective {
        /// Rejected directive.
        directive: String,
        /// Parser error.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    /// A global subscriber is already installed.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs a formatted subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` when the variable is unset or invalid.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidDirective`] when `default_directive`
/// is needed and does not parse, or [`TelemetryError::AlreadyInstalled`] on a
/// second call.
pub fn init(default_directive: &str) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(default_directive).map_err(|source| TelemetryError::InvalidDirective {
            directive: default_directive.to_owned(),
            source,
        })
    })?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;
    Ok(())
}
