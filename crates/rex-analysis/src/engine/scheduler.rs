//! Portfolio scheduler
//!
//! Picks an execution mode for the whole portfolio, fans per-asset tasks out
//! through a [`WorkerPool`] and collects results by input index, so output
//! order always matches position order. A failure of the concurrent
//! machinery itself reruns the portfolio sequentially.

use futures::future::join_all;
use rex_core::{Portfolio, Position};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use super::asset_task::{AnalysisOutcome, AssetAnalyzer};
use super::correlation::{apply_portfolio_weights, portfolio_concentration};
use super::pool::{PoolClosed, WorkerPool};
use crate::config::{SchedulerConfig, clamp_concurrency};
use crate::error::{AnalysisError, Result};
use crate::indicators::ConcentrationMetrics;
use crate::models::AssetAnalysis;
use crate::timing::{Sleeper, TokioSleeper};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One concurrent task per position
    Direct,
    /// Consecutive chunks of `max_concurrent` positions
    Batched,
    /// One position at a time
    Sequential,
}

/// Everything a portfolio run produced
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioRun {
    /// One analysis per position, in input order
    pub analyses: Vec<AssetAnalysis>,
    /// Mode selected before any fallback
    pub mode: ExecutionMode,
    /// Chunks started in parallel modes; 0 when sequential
    pub batches: usize,
    /// Positions that ended up with the placeholder analysis
    pub fallbacks: usize,
    pub fell_back_to_sequential: bool,
    pub concentration: Option<ConcentrationMetrics>,
}

/// Orchestration-level failure that aborts parallel execution
#[derive(Debug)]
enum Systemic {
    PoolClosed,
    Join(JoinError),
}

impl std::fmt::Display for Systemic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PoolClosed => write!(f, "{}", PoolClosed),
            Self::Join(e) => write!(f, "task join failed: {e}"),
        }
    }
}

pub struct PortfolioScheduler {
    analyzer: Arc<AssetAnalyzer>,
    config: SchedulerConfig,
    sleeper: Arc<dyn Sleeper>,
    pool: WorkerPool,
}

impl std::fmt::Debug for PortfolioScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioScheduler")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl PortfolioScheduler {
    pub fn new(analyzer: Arc<AssetAnalyzer>, config: SchedulerConfig) -> Result<Self> {
        Self::with_sleeper(analyzer, config, Arc::new(TokioSleeper))
    }

    /// Use a custom sleeper for stagger, rate-limit and batch delays
    pub fn with_sleeper(
        analyzer: Arc<AssetAnalyzer>,
        config: SchedulerConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pool: WorkerPool::new(config.max_concurrent),
            analyzer,
            config,
            sleeper,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn analyzer(&self) -> &Arc<AssetAnalyzer> {
        &self.analyzer
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Disable parallel processing for debugging or API rate limiting
    pub fn disable_parallel_processing(&mut self) {
        self.config.parallel_enabled = false;
        info!("Parallel processing disabled");
    }

    pub fn enable_parallel_processing(&mut self) {
        self.config.parallel_enabled = true;
        info!("Parallel processing enabled");
    }

    /// Set the concurrency limit, clamped to 1..=50; returns the applied value
    pub fn set_max_concurrent(&mut self, max_concurrent: usize) -> usize {
        let applied = clamp_concurrency(max_concurrent);
        self.config.max_concurrent = applied;
        self.pool = WorkerPool::new(applied);
        info!("Max concurrent analyses set to {}", applied);
        applied
    }

    pub fn select_mode(&self, position_count: usize) -> ExecutionMode {
        if !self.config.parallel_enabled {
            ExecutionMode::Sequential
        } else if position_count <= self.config.max_concurrent {
            ExecutionMode::Direct
        } else {
            ExecutionMode::Batched
        }
    }

    /// Analyze every position, in input order
    pub async fn analyze_portfolio(&self, portfolio: &Portfolio) -> Result<Vec<AssetAnalysis>> {
        Ok(self.run(portfolio).await?.analyses)
    }

    pub async fn run(&self, portfolio: &Portfolio) -> Result<PortfolioRun> {
        let total_value = portfolio.total_value();
        if !total_value.is_finite() {
            return Err(AnalysisError::Scheduler(format!(
                "portfolio total value is not finite: {total_value}"
            )));
        }

        let positions = portfolio.positions();
        let mode = self.select_mode(positions.len());

        if positions.is_empty() {
            warn!("No positions found in portfolio");
            return Ok(PortfolioRun {
                analyses: Vec::new(),
                mode,
                batches: 0,
                fallbacks: 0,
                fell_back_to_sequential: false,
                concentration: None,
            });
        }

        info!(
            "Analyzing portfolio with {} positions in {:?} mode",
            positions.len(),
            mode
        );

        let (outcomes, batches, fell_back) = match mode {
            ExecutionMode::Sequential => (self.run_sequential(positions, total_value).await, 0, false),
            ExecutionMode::Direct | ExecutionMode::Batched => {
                let chunk_size = match mode {
                    ExecutionMode::Direct => positions.len(),
                    _ => self.config.max_concurrent,
                };
                match self.run_parallel(positions, chunk_size, total_value).await {
                    Ok((outcomes, batches)) => (outcomes, batches, false),
                    Err(e) => {
                        error!("Error during parallel analysis execution: {}", e);
                        info!("Falling back to sequential processing");
                        (self.run_sequential(positions, total_value).await, 0, true)
                    }
                }
            }
        };

        let fallbacks = outcomes.iter().filter(|o| o.is_fallback()).count();
        let mut analyses: Vec<AssetAnalysis> =
            outcomes.into_iter().map(AnalysisOutcome::into_analysis).collect();
        apply_portfolio_weights(&mut analyses, portfolio);

        info!(
            "Completed portfolio analysis with {} asset analyses ({} fallbacks)",
            analyses.len(),
            fallbacks
        );

        Ok(PortfolioRun {
            analyses,
            mode,
            batches,
            fallbacks,
            fell_back_to_sequential: fell_back,
            concentration: portfolio_concentration(portfolio),
        })
    }

    async fn run_sequential(&self, positions: &[Position], total_value: f64) -> Vec<AnalysisOutcome> {
        info!("Running sequential analysis for {} positions", positions.len());
        let mut outcomes = Vec::with_capacity(positions.len());
        for position in positions {
            outcomes.push(self.analyzer.analyze(position, Some(total_value)).await);
        }
        outcomes
    }

    async fn run_parallel(
        &self,
        positions: &[Position],
        chunk_size: usize,
        total_value: f64,
    ) -> std::result::Result<(Vec<AnalysisOutcome>, usize), Systemic> {
        let chunk_size = chunk_size.max(1);
        let total_batches = positions.len().div_ceil(chunk_size);
        let mut outcomes = Vec::with_capacity(positions.len());

        for (index, chunk) in positions.chunks(chunk_size).enumerate() {
            if index > 0 {
                self.sleeper.sleep(self.config.batch_delay).await;
            }
            if total_batches > 1 {
                info!(
                    "Processing batch {}/{} with {} positions",
                    index + 1,
                    total_batches,
                    chunk.len()
                );
            }
            outcomes.extend(self.run_chunk(chunk, total_value).await?);
        }

        Ok((outcomes, total_batches))
    }

    /// Run one chunk concurrently, results in chunk order
    async fn run_chunk(
        &self,
        chunk: &[Position],
        total_value: f64,
    ) -> std::result::Result<Vec<AnalysisOutcome>, Systemic> {
        let handles: Vec<_> = chunk
            .iter()
            .enumerate()
            .map(|(slot, position)| {
                let analyzer = Arc::clone(&self.analyzer);
                let sleeper = Arc::clone(&self.sleeper);
                let position = position.clone();
                let stagger = stagger_for(self.config.stagger_delay, slot);
                let rate_limit = self.config.rate_limit_delay;

                self.pool.spawn(async move {
                    sleeper.sleep(stagger).await;
                    sleeper.sleep(rate_limit).await;
                    analyzer.analyze(&position, Some(total_value)).await
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(chunk.len());
        for (joined, position) in join_all(handles).await.into_iter().zip(chunk) {
            match joined {
                Ok(Ok(outcome)) => outcomes.push(outcome),
                Ok(Err(PoolClosed)) => return Err(Systemic::PoolClosed),
                Err(e) if e.is_panic() => {
                    error!("Analysis task for {} panicked", position.symbol());
                    outcomes.push(AnalysisOutcome::fallback(position, "analysis task panicked"));
                }
                Err(e) => return Err(Systemic::Join(e)),
            }
        }
        Ok(outcomes)
    }
}

fn stagger_for(delay: Duration, slot: usize) -> Duration {
    delay.saturating_mul(u32::try_from(slot).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FALLBACK_REASONING, Recommendation};
    use crate::testing::{FakeMarket, sample_portfolio};
    use crate::timing::RecordingSleeper;

    fn scheduler(
        market: &FakeMarket,
        config: SchedulerConfig,
    ) -> (PortfolioScheduler, Arc<RecordingSleeper>) {
        let sleeper = RecordingSleeper::new();
        let analyzer = Arc::new(market.analyzer(sleeper.clone()));
        let scheduler = PortfolioScheduler::with_sleeper(analyzer, config, sleeper.clone()).unwrap();
        (scheduler, sleeper)
    }

    fn config(max_concurrent: usize) -> SchedulerConfig {
        SchedulerConfig::builder()
            .max_concurrent(max_concurrent)
            .stagger_delay(Duration::from_millis(100))
            .rate_limit_delay(Duration::from_secs(1))
            .batch_delay(Duration::from_secs(2))
            .build()
            .unwrap()
    }

    fn symbols(analyses: &[AssetAnalysis]) -> Vec<String> {
        analyses.iter().map(|a| a.symbol.clone()).collect()
    }

    #[test]
    fn test_stagger_for() {
        assert_eq!(stagger_for(Duration::from_millis(100), 0), Duration::ZERO);
        assert_eq!(stagger_for(Duration::from_millis(100), 3), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_mode_selection() {
        let market = FakeMarket::new();
        let (mut scheduler, _) = scheduler(&market, config(5));

        assert_eq!(scheduler.select_mode(5), ExecutionMode::Direct);
        assert_eq!(scheduler.select_mode(6), ExecutionMode::Batched);

        scheduler.disable_parallel_processing();
        assert_eq!(scheduler.select_mode(1), ExecutionMode::Sequential);
        scheduler.enable_parallel_processing();
        assert_eq!(scheduler.select_mode(1), ExecutionMode::Direct);
    }

    #[tokio::test]
    async fn test_set_max_concurrent_clamps() {
        let market = FakeMarket::new();
        let (mut scheduler, _) = scheduler(&market, config(5));

        assert_eq!(scheduler.set_max_concurrent(0), 1);
        assert_eq!(scheduler.set_max_concurrent(500), 50);
        assert_eq!(scheduler.pool().size(), 50);
        assert_eq!(scheduler.set_max_concurrent(8), 8);
        assert_eq!(scheduler.config().max_concurrent, 8);
    }

    #[tokio::test]
    async fn test_empty_portfolio() {
        let market = FakeMarket::new();
        let (scheduler, sleeper) = scheduler(&market, config(5));

        let run = scheduler.run(&Portfolio::empty()).await.unwrap();
        assert!(run.analyses.is_empty());
        assert_eq!(run.batches, 0);
        assert!(sleeper.calls().is_empty());
        assert_eq!(market.generator_calls(), 0);
    }

    #[tokio::test]
    async fn test_batched_run_preserves_order() {
        let market = FakeMarket::new();
        let (scheduler, sleeper) = scheduler(&market, config(5));
        let portfolio = sample_portfolio(12);

        let run = scheduler.run(&portfolio).await.unwrap();

        assert_eq!(run.mode, ExecutionMode::Batched);
        assert_eq!(run.batches, 3);
        assert_eq!(run.analyses.len(), 12);
        assert_eq!(run.fallbacks, 0);
        assert!(!run.fell_back_to_sequential);

        let expected: Vec<String> = portfolio.positions().iter().map(|p| p.symbol().to_string()).collect();
        assert_eq!(symbols(&run.analyses), expected);

        // Two gaps between three batches, one rate-limit pause per task
        assert_eq!(sleeper.count_of(Duration::from_secs(2)), 2);
        assert_eq!(sleeper.count_of(Duration::from_secs(1)), 12);
        // Largest stagger slot is the fifth task of a full batch
        assert_eq!(sleeper.count_of(Duration::from_millis(400)), 2);
        assert_eq!(market.generator_calls(), 12);
    }

    #[tokio::test]
    async fn test_direct_run_with_failing_position() {
        let market = FakeMarket::new().failing("SYM2");
        let (scheduler, sleeper) = scheduler(&market, config(5));
        let portfolio = sample_portfolio(5);

        let run = scheduler.run(&portfolio).await.unwrap();

        assert_eq!(run.mode, ExecutionMode::Direct);
        assert_eq!(run.batches, 1);
        assert_eq!(run.analyses.len(), 5);
        assert_eq!(run.fallbacks, 1);
        assert_eq!(sleeper.count_of(Duration::from_secs(2)), 0);

        for analysis in &run.analyses {
            if analysis.symbol == "SYM2" {
                assert!(analysis.is_fallback);
                assert_eq!(analysis.recommendation, Recommendation::Hold);
                assert_eq!(analysis.reasoning, FALLBACK_REASONING);
            } else {
                assert!(!analysis.is_fallback);
                assert_eq!(analysis.recommendation, Recommendation::Buy);
            }
        }
        assert_eq!(symbols(&run.analyses), vec!["SYM0", "SYM1", "SYM2", "SYM3", "SYM4"]);
    }

    #[tokio::test]
    async fn test_sequential_mode() {
        let market = FakeMarket::new();
        let (mut scheduler, sleeper) = scheduler(&market, config(5));
        scheduler.disable_parallel_processing();

        let run = scheduler.run(&sample_portfolio(7)).await.unwrap();

        assert_eq!(run.mode, ExecutionMode::Sequential);
        assert_eq!(run.batches, 0);
        assert_eq!(run.analyses.len(), 7);
        // Sequential mode adds no scheduling delays of its own
        assert_eq!(sleeper.count_of(Duration::from_secs(1)), 0);
    }

    #[tokio::test]
    async fn test_closed_pool_falls_back_to_sequential() {
        let market = FakeMarket::new();
        let (scheduler, _) = scheduler(&market, config(5));
        scheduler.pool().close();

        let portfolio = sample_portfolio(4);
        let run = scheduler.run(&portfolio).await.unwrap();

        assert_eq!(run.mode, ExecutionMode::Direct);
        assert!(run.fell_back_to_sequential);
        assert_eq!(run.analyses.len(), 4);
        assert_eq!(run.fallbacks, 0);
        assert_eq!(market.generator_calls(), 4);
    }

    #[tokio::test]
    async fn test_correlation_pass_applied() {
        let market = FakeMarket::new();
        let (scheduler, _) = scheduler(&market, config(5));
        let portfolio = sample_portfolio(3);

        let analyses = scheduler.analyze_portfolio(&portfolio).await.unwrap();

        for (analysis, position) in analyses.iter().zip(portfolio.positions()) {
            let expected = position.market_value() / portfolio.total_value();
            assert_eq!(analysis.risk.portfolio_weight, Some(expected));
            assert!(analysis.risk.diversification_impact.is_some());
        }
    }
}
