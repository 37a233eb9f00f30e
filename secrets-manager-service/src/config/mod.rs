//! Configuration for secrets-manager-service.

use service_core::config::{get_env, get_env_parsed, Config as CommonConfig};
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// `DATABASE_URL` value that selects the in-process store.
pub const MEMORY_DATABASE_URL: &str = "memory://";

#[derive(Debug, Clone)]
pub struct SecretsManagerConfig {
    pub common: CommonConfig,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url == MEMORY_DATABASE_URL
    }
}

/// Cadence of the background sweeps. The retention windows themselves are
/// fixed and not configurable.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    pub enabled: bool,
    pub trash_sweep_interval_secs: u64,
    pub auth_request_sweep_interval_secs: u64,
}

impl RetentionConfig {
    pub fn trash_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.trash_sweep_interval_secs.max(1))
    }

    pub fn auth_request_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.auth_request_sweep_interval_secs.max(1))
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trash_sweep_interval_secs: 24 * 60 * 60,
            auth_request_sweep_interval_secs: 15 * 60,
        }
    }
}

impl SecretsManagerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common = CommonConfig::load()?;
        let is_prod = common.is_prod()
            || env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";
        let defaults = RetentionConfig::default();

        Ok(SecretsManagerConfig {
            service_name: get_env("SERVICE_NAME", Some("secrets-manager-service"), is_prod)?,
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: get_env_parsed("DB_MAX_CONNECTIONS", 10, is_prod)?,
                min_connections: get_env_parsed("DB_MIN_CONNECTIONS", 1, is_prod)?,
            },
            retention: RetentionConfig {
                enabled: get_env_parsed("RETENTION_ENABLED", defaults.enabled, is_prod)?,
                trash_sweep_interval_secs: get_env_parsed(
                    "TRASH_SWEEP_INTERVAL_SECS",
                    defaults.trash_sweep_interval_secs,
                    is_prod,
                )?,
                auth_request_sweep_interval_secs: get_env_parsed(
                    "AUTH_REQUEST_SWEEP_INTERVAL_SECS",
                    defaults.auth_request_sweep_interval_secs,
                    is_prod,
                )?,
            },
            common,
        })
    }
}
