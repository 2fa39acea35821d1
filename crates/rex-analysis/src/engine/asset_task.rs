//! Per-asset analysis task
//!
//! Gathers context from the collaborators (each call retried on its own),
//! builds the four sub-analyses, asks the generator for a verdict and
//! aggregates it. Results are memoized per symbol per day. Failures never
//! escape: the caller gets a conservative placeholder instead.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use rex_core::Position;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::aggregator::Aggregator;
use crate::analyzers::{RiskInputs, analyze_events, analyze_sentiment, analyze_technical, assess_risk};
use crate::cache::{AnalysisCache, AnalysisKey};
use crate::config::{AnalyzerConfig, RetryConfig};
use crate::error::{AnalysisError, Result};
use crate::indicators::{PriceSeries, normalize_bars};
use crate::models::{AssetAnalysis, SubAnalyses};
use crate::providers::{AssetContext, Collaborators, CompanyInfo, GenerationContext};
use crate::retry::RetryPolicy;
use crate::timing::{Clock, Sleeper, SystemClock, TokioSleeper};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Result of analyzing one position
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Analyzed(AssetAnalysis),
    /// Placeholder substituted after an unrecoverable failure
    Fallback {
        analysis: AssetAnalysis,
        reason: String,
    },
}

impl AnalysisOutcome {
    pub fn fallback(position: &Position, reason: impl Into<String>) -> Self {
        Self::Fallback {
            analysis: AssetAnalysis::fallback(position),
            reason: reason.into(),
        }
    }

    pub fn analysis(&self) -> &AssetAnalysis {
        match self {
            Self::Analyzed(analysis) | Self::Fallback { analysis, .. } => analysis,
        }
    }

    pub fn into_analysis(self) -> AssetAnalysis {
        match self {
            Self::Analyzed(analysis) | Self::Fallback { analysis, .. } => analysis,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Analyzes single positions against the injected collaborators
pub struct AssetAnalyzer {
    collaborators: Collaborators,
    retry: RetryPolicy,
    generator_retry: RetryPolicy,
    aggregator: Aggregator,
    cache: AnalysisCache,
    clock: Arc<dyn Clock>,
    limiter: Option<SharedRateLimiter>,
    config: AnalyzerConfig,
}

impl std::fmt::Debug for AssetAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetAnalyzer")
            .field("retry", &self.retry)
            .field("generator_retry", &self.generator_retry)
            .field("rate_limited", &self.limiter.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AssetAnalyzer {
    pub fn builder(collaborators: Collaborators) -> AssetAnalyzerBuilder {
        AssetAnalyzerBuilder::new(collaborators)
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Analyze a position outside any portfolio context
    pub async fn analyze_one(&self, position: &Position) -> AssetAnalysis {
        self.analyze(position, None).await.into_analysis()
    }

    /// Analyze a position knowing the total value of its portfolio
    pub async fn analyze_in_portfolio(
        &self,
        position: &Position,
        portfolio_value: f64,
    ) -> AssetAnalysis {
        self.analyze(position, Some(portfolio_value))
            .await
            .into_analysis()
    }

    /// Analyze a position, reporting whether the placeholder was used
    pub async fn analyze(&self, position: &Position, portfolio_value: Option<f64>) -> AnalysisOutcome {
        let key = AnalysisKey::new(position.symbol(), self.clock.today());

        if let Some(cached) = self.cache.get(&key).await {
            info!("Using cached analysis for {}", key.symbol);
            return AnalysisOutcome::Analyzed(cached);
        }

        info!("Analyzing asset: {}", key.symbol);
        let weight = portfolio_value
            .filter(|total| *total > 0.0)
            .map(|total| position.market_value() / total);

        match self.analyze_uncached(position, weight).await {
            Ok(analysis) => {
                self.cache.insert(key, analysis.clone()).await;
                info!(
                    "Completed analysis for {}: {} ({:.0}% confidence)",
                    analysis.symbol,
                    analysis.recommendation,
                    analysis.confidence * 100.0
                );
                AnalysisOutcome::Analyzed(analysis)
            }
            Err(e) => {
                error!("Error analyzing asset {}: {}", position.symbol(), e);
                AnalysisOutcome::fallback(position, e.to_string())
            }
        }
    }

    async fn gate(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    async fn analyze_uncached(&self, position: &Position, weight: Option<f64>) -> Result<AssetAnalysis> {
        let symbol = position.symbol();
        let c = &self.collaborators;

        // Company details only sharpen the searches; losing them is tolerated
        let company = match self
            .retry
            .execute("company_info", || async move {
                self.gate().await;
                c.company.company_info(symbol).await
            })
            .await
        {
            Ok(info) => {
                debug!(
                    "Retrieved sector: {:?}, industry: {:?} for {}",
                    info.sector, info.industry, symbol
                );
                info
            }
            Err(e) => {
                warn!("Failed to fetch company info for {}: {}", symbol, e);
                CompanyInfo::default()
            }
        };
        let context = AssetContext::new(symbol).with_company(&company);
        let context = &context;

        let benchmark = self.config.benchmark_symbol.as_deref();
        let (history, sentiment, events, benchmark_history) = tokio::join!(
            self.retry.execute("price_history", || async move {
                self.gate().await;
                c.prices.history(symbol).await
            }),
            self.retry.execute("sentiment", || async move {
                self.gate().await;
                c.sentiment.sentiment(context).await
            }),
            self.retry.execute("events", || async move {
                self.gate().await;
                c.events.events(context).await
            }),
            async move {
                let bench = benchmark?;
                self.retry
                    .execute("benchmark_history", || async move {
                        self.gate().await;
                        c.prices.history(bench).await
                    })
                    .await
                    .map_err(|e| warn!("Benchmark history unavailable for {}: {}", bench, e))
                    .ok()
            },
        );

        let bars = normalize_bars(history?);
        if bars.is_empty() {
            return Err(AnalysisError::InsufficientData {
                symbol: symbol.to_string(),
                reason: "no usable price bars".to_string(),
            });
        }
        let series = PriceSeries::from_bars(&bars);
        let benchmark_series = benchmark_history.map(|b| PriceSeries::from_bars(&normalize_bars(b)));

        let risk_inputs = RiskInputs {
            beta: company.beta,
            portfolio_weight: weight,
            benchmark: benchmark_series.as_ref(),
            risk_free_rate: self.config.risk_free_rate,
            ..RiskInputs::new(&series, position.asset_class())
        };

        let subs = SubAnalyses {
            technical: analyze_technical(&series),
            sentiment: analyze_sentiment(&sentiment?),
            event: analyze_events(&events?, self.config.max_events),
            risk: assess_risk(&risk_inputs),
        };

        let generation = GenerationContext {
            symbol: symbol.to_string(),
            company_name: company.name.clone().or_else(|| position.name().map(str::to_string)),
            sector: company.sector.clone(),
            industry: company.industry.clone(),
            portfolio_weight: weight,
            analyses: subs.clone(),
        };
        let generation = &generation;
        let text = self
            .generator_retry
            .execute("recommendation", || async move {
                self.gate().await;
                c.generator.generate(position, generation).await
            })
            .await?;

        let verdict = self.aggregator.aggregate(&subs, &text);
        Ok(AssetAnalysis::new(position, subs, verdict))
    }
}

/// Builder for [`AssetAnalyzer`]
pub struct AssetAnalyzerBuilder {
    collaborators: Collaborators,
    retry: RetryConfig,
    generator_retry: RetryConfig,
    config: AnalyzerConfig,
    sleeper: Option<Arc<dyn Sleeper>>,
    clock: Option<Arc<dyn Clock>>,
    cache: Option<AnalysisCache>,
    calls_per_second: Option<u32>,
}

impl AssetAnalyzerBuilder {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            retry: RetryConfig::default(),
            generator_retry: RetryConfig::llm(),
            config: AnalyzerConfig::default(),
            sleeper: None,
            clock: None,
            cache: None,
            calls_per_second: None,
        }
    }

    /// Retry policy for data collaborators
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Retry policy for the recommendation generator
    pub fn generator_retry(mut self, config: RetryConfig) -> Self {
        self.generator_retry = config;
        self
    }

    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Share an existing cache instead of starting empty
    pub fn cache(mut self, cache: AnalysisCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Cap collaborator calls across every task using this analyzer
    pub fn calls_per_second(mut self, quota: Option<u32>) -> Self {
        self.calls_per_second = quota;
        self
    }

    pub fn build(self) -> Result<AssetAnalyzer> {
        self.retry.validate()?;
        self.generator_retry.validate()?;

        let limiter = self
            .calls_per_second
            .map(|quota| {
                NonZeroU32::new(quota)
                    .map(|q| Arc::new(RateLimiter::direct(Quota::per_second(q))))
                    .ok_or_else(|| {
                        AnalysisError::Config("calls_per_second must be greater than 0".to_string())
                    })
            })
            .transpose()?;

        let sleeper = self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper));

        Ok(AssetAnalyzer {
            retry: RetryPolicy::new(self.retry, Arc::clone(&sleeper)),
            generator_retry: RetryPolicy::new(self.generator_retry, sleeper),
            aggregator: Aggregator::new(&self.config)?,
            cache: self.cache.unwrap_or_default(),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            limiter,
            config: self.config,
            collaborators: self.collaborators,
        })
    }
}
