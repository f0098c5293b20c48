//! Configuration module for coach-service.

use crate::services::selector::Strategy;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CoachConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    /// `None` keeps everything in process memory.
    pub database: Option<DatabaseConfig>,
    pub selector: SelectorConfig,
    pub generation: GenerationConfig,
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub strategy: Strategy,
    pub num_clusters: usize,
    /// New messages between refits; 0 never refits.
    pub refit_interval: usize,
    pub corpus_window: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Keyword,
            num_clusters: 3,
            refit_interval: 25,
            corpus_window: 5000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Base URL of the inference API. Unset disables generation.
    pub endpoint: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    pub max_new_tokens: u32,
    pub timeout: Duration,
    pub history_window: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: "gpt2".to_string(),
            api_key: None,
            max_new_tokens: 50,
            timeout: Duration::from_millis(5000),
            history_window: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cache_capacity: usize,
    /// Reject turns for session ids that were never created.
    pub strict: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 10_000,
            strict: false,
        }
    }
}

impl CoachConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let database = match env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => Some(DatabaseConfig {
                url,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", 2)?,
            }),
            _ => None,
        };

        let strategy = match env::var("COACH_STRATEGY") {
            Ok(raw) => Strategy::from_str(&raw).map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("COACH_STRATEGY: {}", e))
            })?,
            Err(_) => Strategy::Keyword,
        };

        let num_clusters: usize = parse_env("COACH_NUM_CLUSTERS", 3)?;
        if num_clusters < 1 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "COACH_NUM_CLUSTERS must be at least 1"
            )));
        }

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "coach-service".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database,
            selector: SelectorConfig {
                strategy,
                num_clusters,
                refit_interval: parse_env("COACH_REFIT_INTERVAL", 25)?,
                corpus_window: parse_env("COACH_CORPUS_WINDOW", 5000)?,
            },
            generation: GenerationConfig {
                endpoint: env::var("GENERATION_ENDPOINT").ok().filter(|s| !s.is_empty()),
                model: env::var("GENERATION_MODEL").unwrap_or_else(|_| "gpt2".to_string()),
                api_key: env::var("GENERATION_API_KEY").ok().filter(|s| !s.is_empty()),
                max_new_tokens: parse_env("COACH_MAX_NEW_TOKENS", 50)?,
                timeout: Duration::from_millis(parse_env("COACH_GENERATION_TIMEOUT_MS", 5000)?),
                history_window: parse_env("COACH_HISTORY_WINDOW", 3)?,
            },
            sessions: SessionConfig {
                cache_capacity: parse_env("COACH_SESSION_CACHE_CAPACITY", 10_000)?,
                strict: parse_env("COACH_STRICT_SESSIONS", false)?,
            },
        })
    }
}

/// Read and parse an optional variable. Present but unparseable values are
/// configuration errors rather than silently defaulted.
fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e))
        }),
        Err(_) => Ok(default),
    }
}
