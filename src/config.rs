//! Environment-driven server configuration. Missing required variables
//! are fatal at startup; everything else falls back to a sensible default.

use crate::utils::validate::NameAlphabet;
use log::LevelFilter;
use std::{env, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;

/// The server version extracted from the Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Which SQL dialect the durable store speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Sqlite,
    Postgresql,
}

pub struct Config {
    /// Connection string for the durable store
    pub database_url: String,
    pub database_type: DatabaseType,
    /// Size of the pool used for CPU-bound offload (replay parsing,
    /// leaderboard rank recomputation)
    pub worker_processes: usize,
    /// Idle timeout for user-facing views, surfaced to the view layer
    pub global_timeout: Duration,
    /// Directory for the log file, failed-writes log, catalog files and
    /// the local replay fallback store
    pub data_dir: PathBuf,
    pub logging: LevelFilter,
    /// Object store credentials; local file storage is used when absent
    pub supabase: Option<SupabaseConfig>,
    /// Activation code `/activate` submissions are checked against
    pub activation_code: Option<String>,
    /// Whether display names may use non-ASCII letters
    pub name_alphabet: NameAlphabet,
    pub wave_period: Duration,
    pub match_timeout: Duration,
    pub leaderboard_refresh: Duration,
}

pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
    pub bucket: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {1:?} for environment variable {0}")]
    Invalid(&'static str, String),
}

impl Config {
    /// Loads the configuration from the process environment
    pub fn from_env() -> Result<Config, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let database_type = match required("DATABASE_TYPE")?.as_str() {
            "sqlite" => DatabaseType::Sqlite,
            "postgresql" => DatabaseType::Postgresql,
            other => return Err(ConfigError::Invalid("DATABASE_TYPE", other.to_string())),
        };

        let supabase = match (
            env::var("SUPABASE_URL").ok(),
            env::var("SUPABASE_KEY").ok(),
            env::var("SUPABASE_BUCKET").ok(),
        ) {
            (Some(url), Some(key), Some(bucket)) => Some(SupabaseConfig { url, key, bucket }),
            _ => None,
        };

        Ok(Config {
            database_url,
            database_type,
            worker_processes: parsed("WORKER_PROCESSES", 2)?,
            global_timeout: Duration::from_secs(parsed("GLOBAL_TIMEOUT", 900)?),
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string())),
            logging: parsed("LOGGING_LEVEL", LevelFilter::Info)?,
            supabase,
            activation_code: env::var("ACTIVATION_CODE").ok(),
            name_alphabet: if parsed("INTERNATIONAL_NAMES", false)? {
                NameAlphabet::International
            } else {
                NameAlphabet::English
            },
            wave_period: Duration::from_secs(parsed("WAVE_PERIOD_SECS", 45)?),
            match_timeout: Duration::from_secs(parsed("MATCH_TIMEOUT_SECS", 3600)?),
            leaderboard_refresh: Duration::from_secs(parsed("LEADERBOARD_REFRESH_SECS", 60)?),
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parsed<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid(key, value)),
        Err(_) => Ok(default),
    }
}
