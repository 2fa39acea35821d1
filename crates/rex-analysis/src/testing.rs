//! In-memory collaborators for engine tests

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use rex_core::{Portfolio, Position};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::RetryConfig;
use crate::engine::AssetAnalyzer;
use crate::error::ProviderError;
use crate::indicators::PriceBar;
use crate::providers::{
    AssetContext, Collaborators, CompanyInfo, CompanyInfoProvider, EventProvider,
    GenerationContext, MarketEvent, PriceHistoryProvider, RecommendationGenerator,
    SentimentProvider, SentimentReport,
};
use crate::timing::{ManualClock, Sleeper};

pub(crate) fn test_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

/// `n` daily bars rising one point a day from 100
pub(crate) fn rising_bars(n: usize) -> Vec<PriceBar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + i as f64;
            PriceBar {
                date: start + Days::new(i as u64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000.0,
            }
        })
        .collect()
}

pub(crate) fn buy_text() -> String {
    "=== INVESTMENT RECOMMENDATION ===\n\
     Final Recommendation: BUY\n\
     Confidence Score: 80%\n\
     Reasoning: Strong momentum and earnings growth offer upside.\n\
     Target Price: $175\n\
     === END RECOMMENDATION ==="
        .to_string()
}

/// Equity positions SYM0..SYM{n-1} with distinct values
pub(crate) fn sample_portfolio(n: usize) -> Portfolio {
    let positions = (0..n)
        .map(|i| Position::equity(format!("SYM{i}"), (i + 1) as f64, 100.0 + 10.0 * i as f64).unwrap())
        .collect();
    Portfolio::new(positions).unwrap()
}

/// Deterministic market where selected symbols have no price history
#[derive(Clone, Default)]
pub(crate) struct FakeMarket {
    failing: Arc<HashSet<String>>,
    generator_calls: Arc<AtomicUsize>,
}

impl FakeMarket {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing(mut self, symbol: &str) -> Self {
        let mut failing = (*self.failing).clone();
        failing.insert(symbol.to_string());
        self.failing = Arc::new(failing);
        self
    }

    pub(crate) fn generator_calls(&self) -> usize {
        self.generator_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn collaborators(&self) -> Collaborators {
        let shared = Arc::new(self.clone());
        Collaborators {
            prices: shared.clone(),
            company: shared.clone(),
            sentiment: shared.clone(),
            events: shared.clone(),
            generator: shared,
        }
    }

    pub(crate) fn analyzer(&self, sleeper: Arc<dyn Sleeper>) -> AssetAnalyzer {
        AssetAnalyzer::builder(self.collaborators())
            .retry(RetryConfig::builder().jitter(false).build().unwrap())
            .generator_retry(RetryConfig::no_retry())
            .sleeper(sleeper)
            .clock(Arc::new(ManualClock::new(test_day())))
            .build()
            .unwrap()
    }
}

#[async_trait]
impl PriceHistoryProvider for FakeMarket {
    async fn history(&self, symbol: &str) -> Result<Vec<PriceBar>, ProviderError> {
        if self.failing.contains(symbol) {
            return Err(ProviderError::NotFound(symbol.to_string()));
        }
        Ok(rising_bars(60))
    }
}

#[async_trait]
impl CompanyInfoProvider for FakeMarket {
    async fn company_info(&self, _symbol: &str) -> Result<CompanyInfo, ProviderError> {
        Ok(CompanyInfo {
            name: None,
            sector: Some("Technology".to_string()),
            industry: Some("Software".to_string()),
            beta: Some(1.1),
        })
    }
}

#[async_trait]
impl SentimentProvider for FakeMarket {
    async fn sentiment(&self, _context: &AssetContext) -> Result<SentimentReport, ProviderError> {
        Ok(SentimentReport {
            score: 0.4,
            sources: 3,
            positive_mentions: 5,
            negative_mentions: 1,
            ..SentimentReport::default()
        })
    }
}

#[async_trait]
impl EventProvider for FakeMarket {
    async fn events(&self, _context: &AssetContext) -> Result<Vec<MarketEvent>, ProviderError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl RecommendationGenerator for FakeMarket {
    async fn generate(
        &self,
        _position: &Position,
        _context: &GenerationContext,
    ) -> Result<String, ProviderError> {
        self.generator_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(buy_text())
    }
}
