use crate::core::{AppError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub mod database;
pub mod mpesa;
pub mod server;

pub use database::DatabaseConfig;
pub use mpesa::{MpesaConfig, MpesaEnvironment, ReversalConfig};
pub use server::ServerConfig;

/// Variable lookup used by the `from_source` constructors (environment in production)
pub(crate) type VarSource<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Parse an optional variable, falling back to `default` when unset
pub(crate) fn parse_or<T: FromStr>(vars: VarSource<'_>, key: &str, default: T) -> Result<T> {
    match vars(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Configuration(format!("Invalid {}", key))),
        _ => Ok(default),
    }
}

/// Main application configuration
#[derive(Debug)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    /// `None` when gateway credentials are not configured
    pub mpesa: Option<MpesaConfig>,
    pub recovery: RecoveryConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    /// `LOG_FORMAT=json` switches the fmt layer to JSON lines
    pub log_json: bool,
}

#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    pub interval: Duration,
    /// Intents younger than this are assumed to still be in flight
    pub grace: Duration,
}

impl RecoveryConfig {
    fn from_source(vars: VarSource<'_>) -> Result<Self> {
        Ok(RecoveryConfig {
            interval: Duration::from_secs(parse_or(vars, "RECOVERY_INTERVAL_SECS", 300)?),
            grace: Duration::from_secs(parse_or(vars, "RECOVERY_GRACE_SECS", 60)?),
        })
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        RecoveryConfig {
            interval: Duration::from_secs(300),
            grace: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let vars = |key: &str| env::var(key).ok();

        let config = Config {
            app: AppConfig {
                env: vars("APP_ENV").unwrap_or_else(|| "development".to_string()),
                log_level: vars("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                log_json: vars("LOG_FORMAT")
                    .is_some_and(|format| format.trim().eq_ignore_ascii_case("json")),
            },
            database: DatabaseConfig::from_source(&vars)?,
            server: ServerConfig::from_source(&vars)?,
            mpesa: MpesaConfig::from_source(&vars)?,
            recovery: RecoveryConfig::from_source(&vars)?,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.query_timeout.is_zero() {
            return Err(AppError::Configuration(
                "DATABASE_QUERY_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.database.pool_size > self.database.max_connections {
            return Err(AppError::Configuration(
                "DATABASE_POOL_SIZE cannot exceed DATABASE_MAX_CONNECTIONS".to_string(),
            ));
        }

        if self.recovery.interval.is_zero() {
            return Err(AppError::Configuration(
                "RECOVERY_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        if let Some(mpesa) = &self.mpesa {
            mpesa.validate()?;
        }

        Ok(())
    }
}
