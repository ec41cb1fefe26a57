//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::lock::{LockSettings, LockStrategy};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Wallet lock strategy ("row" or "poll")
    pub lock_strategy: LockStrategy,

    /// Upper bound on waiting for a wallet lock
    pub lock_timeout: Duration,

    /// Sleep between poll attempts
    pub lock_poll_interval: Duration,

    /// Age after which a poll lease counts as abandoned
    pub lock_lease: Duration,

    /// How often the reaper clears abandoned leases
    pub lock_reaper_interval: Duration,

    /// Apply migrations at start-up
    pub run_migrations: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &'static str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = var("DATABASE_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = var("HOST", "127.0.0.1");

        let port = var("PORT", "3000")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = var("ENVIRONMENT", "development");

        let lock_strategy = var("LOCK_STRATEGY", "row")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LOCK_STRATEGY"))?;

        let lock_timeout = parse_millis(&var("LOCK_TIMEOUT_MS", "10000"), "LOCK_TIMEOUT_MS")?;
        let lock_poll_interval =
            parse_millis(&var("LOCK_POLL_INTERVAL_MS", "1000"), "LOCK_POLL_INTERVAL_MS")?;
        let lock_lease = parse_secs(&var("LOCK_LEASE_SECS", "30"), "LOCK_LEASE_SECS")?;
        let lock_reaper_interval = parse_secs(
            &var("LOCK_REAPER_INTERVAL_SECS", "15"),
            "LOCK_REAPER_INTERVAL_SECS",
        )?;

        let run_migrations = var("RUN_MIGRATIONS", "false")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("RUN_MIGRATIONS"))?;

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            lock_strategy,
            lock_timeout,
            lock_poll_interval,
            lock_lease,
            lock_reaper_interval,
            run_migrations,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Lock coordinator settings
    pub fn lock_settings(&self) -> LockSettings {
        LockSettings::default()
            .with_strategy(self.lock_strategy)
            .with_timeout(self.lock_timeout)
            .with_poll_interval(self.lock_poll_interval)
            .with_lease(self.lock_lease)
    }
}

/// Parse a positive duration in milliseconds
fn parse_millis(value: &str, key: &'static str) -> Result<Duration, ConfigError> {
    match value.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidValue(key)),
    }
}

/// Parse a positive duration in seconds
fn parse_secs(value: &str, key: &'static str) -> Result<Duration, ConfigError> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue(key)),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/wallet")]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.lock_strategy, LockStrategy::RowLock);
        assert_eq!(config.lock_timeout, Duration::from_secs(10));
        assert_eq!(config.lock_poll_interval, Duration::from_secs(1));
        assert_eq!(config.lock_lease, Duration::from_secs(30));
        assert!(!config.run_migrations);
        assert!(!config.is_production());
    }

    #[test]
    fn test_missing_database_url() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingEnv("DATABASE_URL"))));
    }

    #[test]
    fn test_lock_settings_from_env() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/wallet"),
            ("LOCK_STRATEGY", "poll"),
            ("LOCK_TIMEOUT_MS", "2500"),
            ("LOCK_POLL_INTERVAL_MS", "50"),
            ("LOCK_LEASE_SECS", "5"),
        ])
        .unwrap();

        let settings = config.lock_settings();
        assert_eq!(settings.strategy, LockStrategy::Poll);
        assert_eq!(settings.timeout, Duration::from_millis(2500));
        assert_eq!(settings.poll_interval, Duration::from_millis(50));
        assert_eq!(settings.lease, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values() {
        let base = ("DATABASE_URL", "postgres://localhost/wallet");

        assert!(matches!(
            load(&[base, ("LOCK_STRATEGY", "optimistic")]),
            Err(ConfigError::InvalidValue("LOCK_STRATEGY"))
        ));
        assert!(matches!(
            load(&[base, ("LOCK_TIMEOUT_MS", "0")]),
            Err(ConfigError::InvalidValue("LOCK_TIMEOUT_MS"))
        ));
        assert!(matches!(
            load(&[base, ("PORT", "http")]),
            Err(ConfigError::InvalidValue("PORT"))
        ));
        assert!(matches!(
            load(&[base, ("RUN_MIGRATIONS", "yes")]),
            Err(ConfigError::InvalidValue("RUN_MIGRATIONS"))
        ));
    }
}
