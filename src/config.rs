//! Store configuration read from the process environment.

use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the `PostgreSQL` connection URL.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
/// Environment variable holding the pool size.
pub const MAX_CONNECTIONS_VAR: &str = "DATABASE_MAX_CONNECTIONS";
/// Environment variable holding the pool checkout timeout in seconds.
pub const CONNECT_TIMEOUT_VAR: &str = "DATABASE_CONNECT_TIMEOUT_SECS";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Errors raised while reading [`StoreConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    /// A variable holds a value that cannot be parsed.
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Description of the accepted values.
        expected: &'static str,
        /// Rejected raw value.
        value: String,
    },
}

/// Connection settings for the `PostgreSQL` assignment store.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Connection URL.
    pub database_url: String,
    /// Maximum number of pooled connections.
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection.
    pub connect_timeout: Duration,
}

impl StoreConfig {
    /// Creates a configuration with default pool settings.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `DATABASE_URL` is missing or a numeric
    /// setting does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable or `None` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `DATABASE_URL` is missing or a numeric
    /// setting does not parse or is zero.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup(DATABASE_URL_VAR)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing(DATABASE_URL_VAR))?;

        let pool_size = parse_positive(
            &lookup,
            MAX_CONNECTIONS_VAR,
            u64::from(DEFAULT_MAX_CONNECTIONS),
        )?;
        let max_connections = u32::try_from(pool_size).map_err(|_| ConfigError::Invalid {
            name: MAX_CONNECTIONS_VAR,
            expected: "a positive 32-bit integer",
            value: pool_size.to_string(),
        })?;
        let connect_timeout =
            parse_positive(&lookup, CONNECT_TIMEOUT_VAR, DEFAULT_CONNECT_TIMEOUT_SECS)?;

        Ok(Self {
            database_url,
            max_connections,
            connect_timeout: Duration::from_secs(connect_timeout),
        })
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("database_url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

fn parse_positive<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name).filter(|value| !value.trim().is_empty()) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::Invalid {
            name,
            expected: "a positive integer",
            value: raw,
        }),
    }
}
