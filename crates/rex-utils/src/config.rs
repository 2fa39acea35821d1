//! Environment-backed runtime settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings read from the process environment
///
/// Delays are given in (fractional) seconds, e.g. `API_RATE_LIMIT_DELAY=0.5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Environment (development, production, ...)
    pub environment: String,
    /// Default tracing level when `RUST_LOG` is unset
    pub log_level: String,
    /// Run per-asset analyses concurrently
    pub enable_parallel_processing: bool,
    /// Upper bound on concurrently running analyses
    pub max_concurrent_analyses: usize,
    /// Pause inside each task before it calls out
    pub api_rate_limit_delay: Duration,
    /// Pause between batches of analyses
    pub batch_delay: Duration,
    /// Offset between consecutive task starts
    pub stagger_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            enable_parallel_processing: true,
            max_concurrent_analyses: 10,
            api_rate_limit_delay: Duration::from_secs(1),
            batch_delay: Duration::from_secs(2),
            stagger_delay: Duration::from_millis(100),
        }
    }
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            log_level: lookup("LOG_LEVEL")
                .map(|level| level.to_lowercase())
                .unwrap_or(defaults.log_level),
            enable_parallel_processing: parse_or(
                &lookup,
                "ENABLE_PARALLEL_PROCESSING",
                defaults.enable_parallel_processing,
            )?,
            max_concurrent_analyses: parse_or(
                &lookup,
                "MAX_CONCURRENT_ANALYSES",
                defaults.max_concurrent_analyses,
            )?,
            api_rate_limit_delay: seconds_or(
                &lookup,
                "API_RATE_LIMIT_DELAY",
                defaults.api_rate_limit_delay,
            )?,
            batch_delay: seconds_or(&lookup, "BATCH_DELAY", defaults.batch_delay)?,
            stagger_delay: seconds_or(&lookup, "STAGGER_DELAY", defaults.stagger_delay)?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .to_lowercase()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn seconds_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let secs: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {key}: {raw:?}"))?;
    Duration::try_from_secs_f64(secs).with_context(|| format!("{key} must be a non-negative number of seconds"))
}
