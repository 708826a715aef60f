//! Process configuration parsed from environment variables.
//!
//! LLM settings live separately in [`crate::llm::config`] so the service
//! can start without a model configured.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_PATH: &str = "./db.json";
pub const DEFAULT_HEALTH_CHECK_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_HEALTH_PROBE_CONCURRENCY: usize = 8;
pub const DEFAULT_HEALTH_PROBE_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_DISPATCH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_DOCS_FETCH_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Timeouts and limits for outbound calls and the health sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub health_check_interval: Duration,
    pub probe_concurrency: usize,
    pub probe_timeout: Duration,
    pub dispatch_timeout: Duration,
    pub docs_timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            health_check_interval: Duration::from_millis(DEFAULT_HEALTH_CHECK_INTERVAL_MS),
            probe_concurrency: DEFAULT_HEALTH_PROBE_CONCURRENCY,
            probe_timeout: Duration::from_millis(DEFAULT_HEALTH_PROBE_TIMEOUT_MS),
            dispatch_timeout: Duration::from_millis(DEFAULT_DISPATCH_TIMEOUT_MS),
            docs_timeout: Duration::from_millis(DEFAULT_DOCS_FETCH_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Shared credential every `/api` request must present in `x-api-key`.
    pub api_key: String,
    pub db_path: PathBuf,
    /// When set, the Postgres store replaces the JSON file.
    pub database_url: Option<String>,
    pub timing: Timing,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `DISPATCHER_API_KEY`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DB_PATH`: default `./db.json`
    /// - `DATABASE_URL`: unset by default
    /// - `HEALTH_CHECK_INTERVAL`: sweep interval in ms, default 60000
    /// - `HEALTH_PROBE_CONCURRENCY`: default 8
    /// - `HEALTH_PROBE_TIMEOUT_MS`: default 3000
    /// - `DISPATCH_TIMEOUT_MS`: default 10000
    /// - `DOCS_FETCH_TIMEOUT_MS`: default 5000
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or `PORT` does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("DISPATCHER_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::Missing("DISPATCHER_API_KEY"))?;

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
            Err(_) => DEFAULT_PORT,
        };

        let timing = Timing {
            health_check_interval: Duration::from_millis(
                env_parse("HEALTH_CHECK_INTERVAL", DEFAULT_HEALTH_CHECK_INTERVAL_MS).max(1),
            ),
            probe_concurrency: env_parse("HEALTH_PROBE_CONCURRENCY", DEFAULT_HEALTH_PROBE_CONCURRENCY).max(1),
            probe_timeout: Duration::from_millis(env_parse("HEALTH_PROBE_TIMEOUT_MS", DEFAULT_HEALTH_PROBE_TIMEOUT_MS)),
            dispatch_timeout: Duration::from_millis(env_parse("DISPATCH_TIMEOUT_MS", DEFAULT_DISPATCH_TIMEOUT_MS)),
            docs_timeout: Duration::from_millis(env_parse("DOCS_FETCH_TIMEOUT_MS", DEFAULT_DOCS_FETCH_TIMEOUT_MS)),
        };

        Ok(Self {
            port,
            api_key,
            db_path: std::env::var("DB_PATH").map_or_else(|_| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from),
            database_url: std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty()),
            timing,
        })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
