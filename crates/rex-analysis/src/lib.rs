//! Portfolio analysis engine for quantrex
//!
//! Given a [`Portfolio`], this crate produces one [`AssetAnalysis`] per
//! position:
//!
//! - Price history, company details, sentiment and events are pulled through
//!   injected collaborator traits (see [`providers`]), each call retried
//!   with exponential backoff
//! - Technical, sentiment, event and risk sub-analyses are computed locally
//!   from that data (see [`indicators`] and [`analyzers`])
//! - A recommendation generator writes the final call, which is parsed,
//!   blended with the sub-analysis scores and checked for consistency
//!   (see [`aggregator`])
//! - Results are cached per symbol per day
//!
//! [`PortfolioScheduler`] runs the per-asset analyses sequentially, in one
//! parallel pass or in staggered batches, depending on the portfolio size.
//! A failing asset degrades to a HOLD placeholder instead of failing the run.
//!
//! # Example
//!
//! ```rust,ignore
//! use rex_analysis::{AssetAnalyzer, Collaborators, PortfolioScheduler, SchedulerConfig};
//! use std::sync::Arc;
//!
//! let collaborators = Collaborators { /* your providers */ };
//! let analyzer = Arc::new(AssetAnalyzer::builder(collaborators).build()?);
//! let scheduler = PortfolioScheduler::new(analyzer, SchedulerConfig::default())?;
//!
//! for analysis in scheduler.analyze_portfolio(&portfolio).await? {
//!     println!("{}: {} ({:.0}%)", analysis.symbol, analysis.recommendation, analysis.confidence * 100.0);
//! }
//! ```

pub mod aggregator;
pub mod analyzers;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod models;
pub mod providers;
pub mod retry;
pub mod timing;

#[cfg(test)]
mod testing;

pub use aggregator::{Aggregator, Consistency, ParseSource, Verdict};
pub use cache::{AnalysisCache, AnalysisKey};
pub use config::{AnalyzerConfig, MAX_CONCURRENT_LIMIT, RetryConfig, SchedulerConfig};
pub use engine::{
    AnalysisOutcome, AssetAnalyzer, AssetAnalyzerBuilder, ExecutionMode, PortfolioRun,
    PortfolioScheduler, analyze_portfolio,
};
pub use error::{AnalysisError, ProviderError, Result};
pub use indicators::{IndicatorSet, PriceBar, PriceSeries, calculate_indicators};
pub use models::{
    AssetAnalysis, EventAnalysis, Recommendation, RiskAssessment, RiskLevel, SentimentAnalysis,
    SubAnalyses, TechnicalAnalysis, TrendDirection,
};
pub use providers::{
    CompanyInfoProvider, Collaborators, EventProvider, PriceHistoryProvider,
    RecommendationGenerator, SentimentProvider,
};
pub use retry::RetryPolicy;
pub use rex_core::{AssetClass, Portfolio, Position};
