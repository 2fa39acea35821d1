//! Error types for portfolio analysis

use rex_core::PortfolioError;
use thiserror::Error;

/// Failure reported by an external collaborator (price feed, news search, LLM)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Provider throttled the request
    #[error("Rate limit exceeded for {provider}")]
    RateLimited { provider: String },

    /// Could not reach the provider
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Request exceeded its deadline
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Provider answered with a non-success status
    #[error("Provider returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// Provider answered with something we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Nothing known about the requested symbol
    #[error("No data for {0}")]
    NotFound(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Whether retrying the same call may succeed
    ///
    /// Rate limits (including a bare 429 status), connection failures,
    /// timeouts and 5xx statuses are transient; everything else is fatal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Connection(_) | Self::Timeout(_) => true,
            Self::Status { code, .. } => *code == 429 || *code >= 500,
            Self::InvalidResponse(_) | Self::NotFound(_) | Self::Other(_) => false,
        }
    }

    pub fn rate_limited(provider: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
        }
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }
}

/// Portfolio analysis errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Collaborator failure that survived the retry policy
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed portfolio input
    #[error("Portfolio error: {0}")]
    Portfolio(#[from] PortfolioError),

    /// Concurrent execution machinery failed as a whole
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Not enough data to produce an analysis
    #[error("Insufficient data for {symbol}: {reason}")]
    InsufficientData { symbol: String, reason: String },
}

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::rate_limited("news");
        assert_eq!(err.to_string(), "Rate limit exceeded for news");

        let err = AnalysisError::InsufficientData {
            symbol: "AAPL".to_string(),
            reason: "No price history".to_string(),
        };
        assert_eq!(err.to_string(), "Insufficient data for AAPL: No price history");
    }

    #[test]
    fn test_retry_classification() {
        assert!(ProviderError::rate_limited("llm").is_retryable());
        assert!(ProviderError::Connection("reset".into()).is_retryable());
        assert!(ProviderError::Timeout("30s".into()).is_retryable());
        assert!(ProviderError::status(503, "unavailable").is_retryable());
        assert!(ProviderError::status(500, "boom").is_retryable());
        assert!(ProviderError::status(429, "slow down").is_retryable());

        assert!(!ProviderError::status(404, "missing").is_retryable());
        assert!(!ProviderError::status(401, "unauthorized").is_retryable());
        assert!(!ProviderError::InvalidResponse("not json".into()).is_retryable());
        assert!(!ProviderError::NotFound("XYZ".into()).is_retryable());
    }

    #[test]
    fn test_error_conversion() {
        let err: AnalysisError = ProviderError::Timeout("history".into()).into();
        match err {
            AnalysisError::Provider(inner) => assert!(inner.is_retryable()),
            _ => panic!("Expected Provider variant"),
        }
    }
}
