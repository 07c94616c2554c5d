//! Configuration module for Warden.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::{Result, WardenError};

/// Authentication configuration.
///
/// Passed explicitly into identity and session operations; nothing in the
/// crate reads it from global state.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Maximum idle time between requests before a session silently expires.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_millis: u64,
    /// Emails granted superuser status. May be empty.
    #[serde(default)]
    pub superuser_emails: HashSet<String>,
}

fn default_session_timeout() -> u64 {
    30 * 60 * 1000 // 30 minutes
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_timeout_millis: default_session_timeout(),
            superuser_emails: HashSet::new(),
        }
    }
}

impl AuthConfig {
    /// Create a config with the given timeout and superuser allow-list.
    pub fn new<I, S>(session_timeout_millis: u64, superuser_emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            session_timeout_millis,
            superuser_emails: superuser_emails.into_iter().map(Into::into).collect(),
        }
        .normalized()
    }

    /// Lowercase and trim every superuser email.
    ///
    /// Stored identity emails are always lowercase, so the allow-list has to be
    /// too for the exact-match check to work.
    pub fn normalized(mut self) -> Self {
        self.superuser_emails = self
            .superuser_emails
            .into_iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Session timeout as a chrono duration.
    pub fn session_timeout(&self) -> chrono::Duration {
        let millis = i64::try_from(self.session_timeout_millis).unwrap_or(i64::MAX);
        chrono::Duration::milliseconds(millis)
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/warden.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/warden.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(WardenError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(s)
            .map_err(|e| WardenError::Config(format!("config parse error: {e}")))?;
        config.auth = config.auth.normalized();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `WARDEN_SESSION_TIMEOUT_MILLIS`: Override the session timeout
    /// - `WARDEN_SUPERUSERS`: Comma-separated superuser emails, replaces the list
    pub fn apply_env_overrides(&mut self) {
        if let Ok(timeout) = std::env::var("WARDEN_SESSION_TIMEOUT_MILLIS") {
            if let Ok(millis) = timeout.trim().parse::<u64>() {
                self.auth.session_timeout_millis = millis;
            }
        }

        if let Ok(superusers) = std::env::var("WARDEN_SUPERUSERS") {
            if !superusers.trim().is_empty() {
                self.auth.superuser_emails =
                    superusers.split(',').map(str::to_string).collect();
                self.auth = std::mem::take(&mut self.auth).normalized();
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The session timeout is zero
    /// - A superuser entry is not an email address
    pub fn validate(&self) -> Result<()> {
        if self.auth.session_timeout_millis == 0 {
            return Err(WardenError::Config(
                "auth.session_timeout_millis must be greater than zero".to_string(),
            ));
        }
        if let Some(bad) = self.auth.superuser_emails.iter().find(|e| !e.contains('@')) {
            return Err(WardenError::Config(format!(
                "auth.superuser_emails entry is not an email: {bad}"
            )));
        }
        Ok(())
    }
}
