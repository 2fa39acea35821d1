//! Portfolio analysis engine
//!
//! [`AssetAnalyzer`] handles one position end to end. [`PortfolioScheduler`]
//! fans the analyzer out over a portfolio and runs the cross-asset pass.

pub mod asset_task;
pub mod correlation;
pub mod pool;
pub mod scheduler;

pub use asset_task::{AnalysisOutcome, AssetAnalyzer, AssetAnalyzerBuilder};
pub use correlation::{apply_portfolio_weights, level_for_weight, portfolio_concentration};
pub use pool::{PoolClosed, WorkerPool};
pub use scheduler::{ExecutionMode, PortfolioRun, PortfolioScheduler};

use rex_core::Portfolio;
use std::sync::Arc;

use crate::config::{RetryConfig, SchedulerConfig};
use crate::error::Result;
use crate::models::AssetAnalysis;
use crate::providers::Collaborators;

/// Analyze a portfolio with default analyzer settings
pub async fn analyze_portfolio(
    collaborators: Collaborators,
    portfolio: &Portfolio,
    scheduler: SchedulerConfig,
    retry: RetryConfig,
) -> Result<Vec<AssetAnalysis>> {
    let analyzer = AssetAnalyzer::builder(collaborators)
        .retry(retry)
        .calls_per_second(scheduler.calls_per_second)
        .build()?;
    PortfolioScheduler::new(Arc::new(analyzer), scheduler)?
        .analyze_portfolio(portfolio)
        .await
}
