//! Collaborator interfaces consumed by the analysis engine
//!
//! Fetching market data, searching news and prompting a language model all
//! happen behind these traits. Implementations report failures as
//! [`ProviderError`] so the retry policy can classify them.

use async_trait::async_trait;
use chrono::NaiveDate;
use rex_core::Position;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ProviderError;
use crate::indicators::PriceBar;
use crate::models::{Impact, SentimentLevel, SubAnalyses};

/// Symbol plus whatever sector context is known, used to focus searches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetContext {
    pub symbol: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

impl AssetContext {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    pub fn with_company(mut self, info: &CompanyInfo) -> Self {
        self.sector.clone_from(&info.sector);
        self.industry.clone_from(&info.industry);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub beta: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    /// In [-1, 1]
    pub score: f64,
    /// Provider's own classification; derived from `score` when absent
    pub level: Option<SentimentLevel>,
    pub sources: usize,
    pub positive_mentions: usize,
    pub negative_mentions: usize,
    pub headlines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Earnings,
    Dividend,
    Split,
    Conference,
    ProductLaunch,
    Regulatory,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub kind: EventKind,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub importance: Importance,
    pub impact: Impact,
}

/// Everything a recommendation generator needs to write its verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationContext {
    pub symbol: String,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub portfolio_weight: Option<f64>,
    pub analyses: SubAnalyses,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    /// Daily bars, oldest first
    async fn history(&self, symbol: &str) -> Result<Vec<PriceBar>, ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompanyInfoProvider: Send + Sync {
    async fn company_info(&self, symbol: &str) -> Result<CompanyInfo, ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SentimentProvider: Send + Sync {
    async fn sentiment(&self, context: &AssetContext) -> Result<SentimentReport, ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventProvider: Send + Sync {
    /// Upcoming events, soonest first
    async fn events(&self, context: &AssetContext) -> Result<Vec<MarketEvent>, ProviderError>;
}

/// The only generative step; the returned text is parsed, never trusted
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecommendationGenerator: Send + Sync {
    async fn generate(
        &self,
        position: &Position,
        context: &GenerationContext,
    ) -> Result<String, ProviderError>;
}

/// Shared handles to every collaborator
#[derive(Clone)]
pub struct Collaborators {
    pub prices: Arc<dyn PriceHistoryProvider>,
    pub company: Arc<dyn CompanyInfoProvider>,
    pub sentiment: Arc<dyn SentimentProvider>,
    pub events: Arc<dyn EventProvider>,
    pub generator: Arc<dyn RecommendationGenerator>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
