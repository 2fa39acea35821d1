//! Configuration for analysis runs

use rex_utils::Settings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AnalysisError, Result};

/// Hard ceiling for concurrently running analyses
pub const MAX_CONCURRENT_LIMIT: usize = 50;

/// Retry behaviour for a single collaborator call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of calls, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry (before multipliers)
    pub base_delay: Duration,

    /// Upper bound applied before jitter
    pub max_delay: Duration,

    /// Growth factor per retry
    pub exponential_base: f64,

    /// Perturb each delay by up to ±10%
    pub jitter: bool,

    /// Constant factor applied on top of the exponential term
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            jitter: true,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// Gentler, longer policy suited to LLM calls
    pub fn llm() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            backoff_multiplier: 1.5,
            ..Self::default()
        }
    }

    /// Single attempt, no waiting
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            exponential_base: 1.0,
            jitter: false,
            backoff_multiplier: 1.0,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(AnalysisError::Config(
                "max_attempts must be greater than 0".to_string(),
            ));
        }
        if !self.exponential_base.is_finite() || self.exponential_base < 1.0 {
            return Err(AnalysisError::Config(
                "exponential_base must be at least 1.0".to_string(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier <= 0.0 {
            return Err(AnalysisError::Config(
                "backoff_multiplier must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for RetryConfig
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    max_attempts: Option<u32>,
    base_delay: Option<Duration>,
    max_delay: Option<Duration>,
    exponential_base: Option<f64>,
    jitter: Option<bool>,
    backoff_multiplier: Option<f64>,
}

impl RetryConfigBuilder {
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = Some(delay);
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    pub fn exponential_base(mut self, base: f64) -> Self {
        self.exponential_base = Some(base);
        self
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = Some(enabled);
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<RetryConfig> {
        let defaults = RetryConfig::default();

        let config = RetryConfig {
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            base_delay: self.base_delay.unwrap_or(defaults.base_delay),
            max_delay: self.max_delay.unwrap_or(defaults.max_delay),
            exponential_base: self.exponential_base.unwrap_or(defaults.exponential_base),
            jitter: self.jitter.unwrap_or(defaults.jitter),
            backoff_multiplier: self.backoff_multiplier.unwrap_or(defaults.backoff_multiplier),
        };

        config.validate()?;
        Ok(config)
    }
}

/// How a portfolio run is fanned out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum analyses in flight; also the batch size
    pub max_concurrent: usize,

    /// Start offset between consecutive tasks of a batch
    pub stagger_delay: Duration,

    /// Pause inside each parallel task before it calls out
    pub rate_limit_delay: Duration,

    /// Pause between consecutive batches
    pub batch_delay: Duration,

    /// When false, positions are analyzed one at a time
    pub parallel_enabled: bool,

    /// Optional global quota on collaborator calls
    pub calls_per_second: Option<u32>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            stagger_delay: Duration::from_millis(100),
            rate_limit_delay: Duration::from_secs(1),
            batch_delay: Duration::from_secs(2),
            parallel_enabled: true,
            calls_per_second: None,
        }
    }
}

impl SchedulerConfig {
    /// Create a new configuration builder
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }

    /// Derive scheduler knobs from environment settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_concurrent: clamp_concurrency(settings.max_concurrent_analyses),
            stagger_delay: settings.stagger_delay,
            rate_limit_delay: settings.api_rate_limit_delay,
            batch_delay: settings.batch_delay,
            parallel_enabled: settings.enable_parallel_processing,
            calls_per_second: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 || self.max_concurrent > MAX_CONCURRENT_LIMIT {
            return Err(AnalysisError::Config(format!(
                "max_concurrent must be between 1 and {MAX_CONCURRENT_LIMIT}"
            )));
        }
        if self.calls_per_second == Some(0) {
            return Err(AnalysisError::Config(
                "calls_per_second must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Clamp a requested concurrency into the supported range
pub fn clamp_concurrency(requested: usize) -> usize {
    requested.clamp(1, MAX_CONCURRENT_LIMIT)
}

/// Builder for SchedulerConfig
#[derive(Debug, Default)]
pub struct SchedulerConfigBuilder {
    max_concurrent: Option<usize>,
    stagger_delay: Option<Duration>,
    rate_limit_delay: Option<Duration>,
    batch_delay: Option<Duration>,
    parallel_enabled: Option<bool>,
    calls_per_second: Option<u32>,
}

impl SchedulerConfigBuilder {
    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = Some(max);
        self
    }

    pub fn stagger_delay(mut self, delay: Duration) -> Self {
        self.stagger_delay = Some(delay);
        self
    }

    pub fn rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = Some(delay);
        self
    }

    pub fn batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = Some(delay);
        self
    }

    pub fn parallel_enabled(mut self, enabled: bool) -> Self {
        self.parallel_enabled = Some(enabled);
        self
    }

    pub fn calls_per_second(mut self, quota: u32) -> Self {
        self.calls_per_second = Some(quota);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SchedulerConfig> {
        let defaults = SchedulerConfig::default();

        let config = SchedulerConfig {
            max_concurrent: self.max_concurrent.unwrap_or(defaults.max_concurrent),
            stagger_delay: self.stagger_delay.unwrap_or(defaults.stagger_delay),
            rate_limit_delay: self.rate_limit_delay.unwrap_or(defaults.rate_limit_delay),
            batch_delay: self.batch_delay.unwrap_or(defaults.batch_delay),
            parallel_enabled: self.parallel_enabled.unwrap_or(defaults.parallel_enabled),
            calls_per_second: self.calls_per_second.or(defaults.calls_per_second),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Tunables for the per-asset analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Annual risk-free rate used by the Sharpe ratio
    pub risk_free_rate: f64,

    /// Symbol whose history is used for market correlation, if any
    pub benchmark_symbol: Option<String>,

    /// Reasoning text is cut to this many characters
    pub max_reasoning_chars: usize,

    /// Upcoming events kept per asset
    pub max_events: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            benchmark_symbol: None,
            max_reasoning_chars: 2500,
            max_events: 5,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_benchmark(mut self, symbol: impl Into<String>) -> Self {
        self.benchmark_symbol = Some(symbol.into().to_uppercase());
        self
    }

    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs_are_valid() {
        assert!(RetryConfig::default().validate().is_ok());
        assert!(RetryConfig::llm().validate().is_ok());
        assert!(RetryConfig::no_retry().validate().is_ok());
        assert!(SchedulerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_retry_builder() {
        let config = RetryConfig::builder()
            .max_attempts(5)
            .base_delay(Duration::from_millis(10))
            .jitter(false)
            .build()
            .unwrap();

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.base_delay, Duration::from_millis(10));
        assert!(!config.jitter);
        assert_eq!(config.backoff_multiplier, 2.0);
    }

    #[test]
    fn test_retry_validation() {
        assert!(RetryConfig::builder().max_attempts(0).build().is_err());
        assert!(RetryConfig::builder().exponential_base(0.5).build().is_err());
        assert!(RetryConfig::builder().backoff_multiplier(0.0).build().is_err());
    }

    #[test]
    fn test_scheduler_builder_and_validation() {
        let config = SchedulerConfig::builder()
            .max_concurrent(5)
            .parallel_enabled(false)
            .calls_per_second(20)
            .build()
            .unwrap();
        assert_eq!(config.max_concurrent, 5);
        assert!(!config.parallel_enabled);
        assert_eq!(config.calls_per_second, Some(20));

        assert!(SchedulerConfig::builder().max_concurrent(0).build().is_err());
        assert!(SchedulerConfig::builder().max_concurrent(51).build().is_err());
        assert!(SchedulerConfig::builder().calls_per_second(0).build().is_err());
    }

    #[test]
    fn test_from_settings_clamps() {
        let settings = Settings {
            max_concurrent_analyses: 500,
            enable_parallel_processing: false,
            stagger_delay: Duration::from_millis(50),
            ..Settings::default()
        };
        let config = SchedulerConfig::from_settings(&settings);
        assert_eq!(config.max_concurrent, MAX_CONCURRENT_LIMIT);
        assert!(!config.parallel_enabled);
        assert_eq!(config.stagger_delay, Duration::from_millis(50));
        assert_eq!(clamp_concurrency(0), 1);
    }
}
