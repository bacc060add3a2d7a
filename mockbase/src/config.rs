//! Mock configuration module.
//!
//! This module provides configuration loading for the mocks from environment
//! variables, so a test suite can switch flushing behaviour or pin identifier
//! generation without code changes.
//!
//! # Environment Variables
//!
//! - `MOCKBASE_AUTO_FLUSH`: `off` (default), `on`/`true`, or a delay in milliseconds
//! - `MOCKBASE_ID_SEED`: Seed for the identifier generator (default: OS entropy)
//! - `MOCKBASE_TOKEN_SECRET`: HS256 secret used to sign ID tokens
//! - `MOCKBASE_TOKEN_TTL_SECS`: ID token lifetime in seconds (default: `3600`)
//!
//! # Invariants
//!
//! - `token_secret` is never empty
//! - `token_ttl_ms` is always greater than zero

use crate::ids::IdGenerator;
use crate::scheduler::AutoFlush;

/// Mock configuration.
///
/// # Post-conditions
///
/// - `token_ttl_ms` is always positive
/// - `token_secret` is non-empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockConfig {
    /// Auto-flush mode applied to every subsystem built from this config.
    pub auto_flush: AutoFlush,
    /// Seed for identifier generation. `None` draws from OS entropy.
    pub id_seed: Option<u64>,
    /// Secret used to sign ID tokens.
    pub token_secret: Vec<u8>,
    /// ID token lifetime in milliseconds.
    pub token_ttl_ms: u64,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self::InvalidValue { name, message } = self;
        write!(f, "invalid value for {name}: {message}")
    }
}

impl std::error::Error for ConfigError {}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            auto_flush: AutoFlush::Off,
            id_seed: None,
            token_secret: Self::DEFAULT_TOKEN_SECRET.as_bytes().to_vec(),
            token_ttl_ms: Self::DEFAULT_TOKEN_TTL_SECS * 1000,
        }
    }
}

impl MockConfig {
    /// Default signing secret. Only suitable for tests.
    pub const DEFAULT_TOKEN_SECRET: &'static str = "mockbase-insecure-test-secret";
    /// Default token lifetime: one hour.
    pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

    /// Load configuration from environment variables.
    ///
    /// Unset variables fall back to [`MockConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `MOCKBASE_AUTO_FLUSH` is neither a switch word nor a number
    /// - `MOCKBASE_ID_SEED` is not a valid `u64`
    /// - `MOCKBASE_TOKEN_SECRET` is set but empty
    /// - `MOCKBASE_TOKEN_TTL_SECS` is not a positive integer
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let auto_flush = match lookup("MOCKBASE_AUTO_FLUSH") {
            Some(value) => parse_auto_flush(&value)?,
            None => defaults.auto_flush,
        };

        let id_seed = match lookup("MOCKBASE_ID_SEED") {
            Some(value) => Some(value.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                name: "MOCKBASE_ID_SEED".to_string(),
                message: format!("'{value}' is not a valid u64"),
            })?),
            None => None,
        };

        let token_secret = match lookup("MOCKBASE_TOKEN_SECRET") {
            Some(value) if value.is_empty() => {
                return Err(ConfigError::InvalidValue {
                    name: "MOCKBASE_TOKEN_SECRET".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            Some(value) => value.into_bytes(),
            None => defaults.token_secret,
        };

        let token_ttl_ms = match lookup("MOCKBASE_TOKEN_TTL_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => secs.saturating_mul(1000),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "MOCKBASE_TOKEN_TTL_SECS".to_string(),
                        message: format!("'{value}' is not a positive number of seconds"),
                    });
                }
            },
            None => defaults.token_ttl_ms,
        };

        Ok(Self {
            auto_flush,
            id_seed,
            token_secret,
            token_ttl_ms,
        })
    }

    /// Build the identifier generator this configuration asks for.
    #[must_use]
    pub fn id_generator(&self) -> IdGenerator {
        self.id_seed
            .map_or_else(IdGenerator::new, IdGenerator::seeded)
    }
}

fn parse_auto_flush(value: &str) -> Result<AutoFlush, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "off" | "false" => Ok(AutoFlush::Off),
        "on" | "true" => Ok(AutoFlush::Immediate),
        number => number
            .parse::<u64>()
            .map(AutoFlush::from)
            .map_err(|_| ConfigError::InvalidValue {
                name: "MOCKBASE_AUTO_FLUSH".to_string(),
                message: format!("'{value}' is not on, off, or a delay in milliseconds"),
            }),
    }
}
