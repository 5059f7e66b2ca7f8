//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8000)
    pub port: u16,
    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub secure_cookies: bool,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for session tokens (32+ bytes)
    pub signing_secret: String,
    /// Plaintext shared secret seeded into an empty credential store
    pub shared_secret: String,
    /// Label stored with the seeded credential
    pub shared_secret_description: String,
    /// PBKDF2 iteration count for stored hashes
    #[serde(default = "default_hash_rounds")]
    pub hash_rounds: u32,
    /// Session lifetime in seconds. Unset means tokens carry no expiry.
    #[serde(default)]
    pub session_max_age: Option<i64>,
}

fn default_hash_rounds() -> u32 {
    260_000
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (TOKENGATE__*)
    ///
    /// Values are not checked here; `validate` runs once logging is up.
    ///
    /// # Errors
    /// Returns error if a source cannot be read or deserialized
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("server.secure_cookies", false)?
            .set_default("database.path", "data/tokengate.db")?
            .set_default("auth.hash_rounds", i64::from(default_hash_rounds()))?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("TOKENGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))
    }

    /// Check required secrets and limits, warning on insecure defaults
    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SIGNING_SECRET_BYTES: usize = 32;
        const MAX_DESCRIPTION_CHARS: usize = 120;

        if self.auth.signing_secret.as_bytes().len() < MIN_SIGNING_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.signing_secret must be at least {} bytes",
                MIN_SIGNING_SECRET_BYTES
            )));
        }

        if self.auth.shared_secret.is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.shared_secret is not set".to_string(),
            ));
        }

        let description = self.auth.shared_secret_description.trim();
        if description.is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.shared_secret_description is not set".to_string(),
            ));
        }
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(crate::error::AppError::Config(format!(
                "auth.shared_secret_description must be at most {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }

        if self.auth.hash_rounds == 0 {
            return Err(crate::error::AppError::Config(
                "auth.hash_rounds must be greater than 0".to_string(),
            ));
        }

        match self.auth.session_max_age {
            Some(max_age) if max_age <= 0 => {
                return Err(crate::error::AppError::Config(
                    "auth.session_max_age must be greater than 0".to_string(),
                ));
            }
            Some(_) => {}
            None => tracing::warn!(
                "auth.session_max_age is unset; issued session tokens never expire"
            ),
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(crate::error::AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got \"{}\"",
                self.logging.format
            )));
        }

        if !self.server.secure_cookies {
            tracing::warn!(
                host = %self.server.host,
                "Using insecure session cookies"
            );
        }

        Ok(())
    }
}
