//! Analysis result types

use chrono::{DateTime, NaiveDate, Utc};
use rex_core::{AssetClass, Position};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::aggregator::{self, Consistency, ParseSource, Verdict};
use crate::indicators::{ChartPattern, IndicatorSet};
use crate::providers::MarketEvent;

/// Confidence carried by every placeholder sub-analysis
pub const DEFAULT_CONFIDENCE: f64 = 0.6;

/// Reasoning attached to an analysis that could not be completed
pub const FALLBACK_REASONING: &str = "Default analysis due to processing error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

impl Recommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }

    /// Case-insensitive match on BUY / SELL / HOLD
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            "HOLD" => Some(Self::Hold),
            _ => None,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    /// Bucket a risk score in [0, 1]
    pub fn from_score(score: f64) -> Self {
        if score < 0.25 {
            Self::Low
        } else if score < 0.5 {
            Self::Medium
        } else if score < 0.75 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very high",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLevel {
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
}

impl SentimentLevel {
    /// Bucket a sentiment score in [-1, 1]
    pub fn from_score(score: f64) -> Self {
        if score >= 0.6 {
            Self::VeryPositive
        } else if score >= 0.2 {
            Self::Positive
        } else if score > -0.2 {
            Self::Neutral
        } else if score > -0.6 {
            Self::Negative
        } else {
            Self::VeryNegative
        }
    }
}

impl fmt::Display for SentimentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VeryPositive => "very positive",
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
            Self::VeryNegative => "very negative",
        })
    }
}

/// Qualitative direction of an event or set of events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Positive,
    Negative,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    pub indicators: IndicatorSet,
    pub trend: TrendDirection,
    pub support_level: Option<f64>,
    pub resistance_level: Option<f64>,
    pub chart_patterns: Vec<ChartPattern>,
    pub buy_signals: Vec<String>,
    pub sell_signals: Vec<String>,
    /// In [0, 1]
    pub technical_score: f64,
    pub confidence: f64,
    pub summary: String,
}

impl TechnicalAnalysis {
    pub fn default_for_missing_data() -> Self {
        Self {
            indicators: IndicatorSet::default(),
            trend: TrendDirection::Neutral,
            support_level: None,
            resistance_level: None,
            chart_patterns: Vec::new(),
            buy_signals: Vec::new(),
            sell_signals: Vec::new(),
            technical_score: 0.5,
            confidence: DEFAULT_CONFIDENCE,
            summary: "Technical analysis completed with limited data".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub level: SentimentLevel,
    /// In [-1, 1]
    pub score: f64,
    pub source_count: usize,
    pub positive_mentions: usize,
    pub negative_mentions: usize,
    pub headlines: Vec<String>,
    pub confidence: f64,
    pub summary: String,
}

impl SentimentAnalysis {
    pub fn default_for_missing_data() -> Self {
        Self {
            level: SentimentLevel::Neutral,
            score: 0.0,
            source_count: 0,
            positive_mentions: 0,
            negative_mentions: 0,
            headlines: Vec::new(),
            confidence: DEFAULT_CONFIDENCE,
            summary: "Sentiment analysis completed with limited data".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAnalysis {
    pub upcoming_events: Vec<MarketEvent>,
    pub earnings_date: Option<NaiveDate>,
    pub dividend_date: Option<NaiveDate>,
    pub positive_catalysts: Vec<String>,
    pub negative_catalysts: Vec<String>,
    pub overall_impact: Impact,
    pub confidence: f64,
}

impl EventAnalysis {
    pub fn default_for_missing_data() -> Self {
        Self {
            upcoming_events: Vec::new(),
            earnings_date: None,
            dividend_date: None,
            positive_catalysts: Vec::new(),
            negative_catalysts: Vec::new(),
            overall_impact: Impact::Neutral,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Daily stdev of simple returns
    pub price_volatility: Option<f64>,
    pub annualized_volatility: Option<f64>,
    pub beta: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub current_drawdown: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub avg_volume: Option<f64>,
    pub market_correlation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// In [0, 1], higher is riskier
    pub score: f64,
    pub metrics: RiskMetrics,
    pub risk_factors: Vec<String>,
    pub mitigation_strategies: Vec<String>,
    /// Fraction of total portfolio value
    pub portfolio_weight: Option<f64>,
    pub diversification_impact: Option<String>,
    pub summary: String,
    pub confidence: f64,
}

impl RiskAssessment {
    pub fn default_for_missing_data() -> Self {
        Self {
            level: RiskLevel::Medium,
            score: 0.5,
            metrics: RiskMetrics::default(),
            risk_factors: Vec::new(),
            mitigation_strategies: Vec::new(),
            portfolio_weight: None,
            diversification_impact: None,
            summary: "Risk assessment completed with limited data".to_string(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

/// The four independent facets computed for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAnalyses {
    pub technical: TechnicalAnalysis,
    pub sentiment: SentimentAnalysis,
    pub event: EventAnalysis,
    pub risk: RiskAssessment,
}

impl SubAnalyses {
    pub fn default_for_missing_data() -> Self {
        Self {
            technical: TechnicalAnalysis::default_for_missing_data(),
            sentiment: SentimentAnalysis::default_for_missing_data(),
            event: EventAnalysis::default_for_missing_data(),
            risk: RiskAssessment::default_for_missing_data(),
        }
    }
}

/// Complete analysis for a single asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetAnalysis {
    pub symbol: String,
    pub asset_class: AssetClass,
    pub current_price: f64,
    pub market_value: f64,

    pub technical: TechnicalAnalysis,
    pub sentiment: SentimentAnalysis,
    pub event: EventAnalysis,
    pub risk: RiskAssessment,

    pub recommendation: Recommendation,
    pub target_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub overall_score: f64,
    pub confidence: f64,
    pub reasoning: String,

    pub parse_source: ParseSource,
    pub consistency: Consistency,
    /// Set when this is the conservative placeholder, not a real analysis
    pub is_fallback: bool,
    pub analyzed_at: DateTime<Utc>,
}

impl AssetAnalysis {
    /// Assemble the final record from sub-analyses and the aggregator's verdict
    pub fn new(position: &Position, subs: SubAnalyses, verdict: Verdict) -> Self {
        Self {
            symbol: position.symbol().to_string(),
            asset_class: position.asset_class(),
            current_price: position.current_price(),
            market_value: position.market_value(),
            technical: subs.technical,
            sentiment: subs.sentiment,
            event: subs.event,
            risk: subs.risk,
            recommendation: verdict.recommendation,
            target_price: verdict.target_price,
            stop_loss: verdict.stop_loss,
            overall_score: verdict.overall_score,
            confidence: verdict.overall_confidence,
            reasoning: verdict.reasoning,
            parse_source: verdict.parse_source,
            consistency: verdict.consistency,
            is_fallback: false,
            analyzed_at: Utc::now(),
        }
    }

    /// Conservative HOLD placeholder used when a position cannot be analyzed
    pub fn fallback(position: &Position) -> Self {
        let subs = SubAnalyses::default_for_missing_data();
        let verdict = Verdict {
            recommendation: Recommendation::Hold,
            overall_score: aggregator::overall_score(&subs),
            overall_confidence: aggregator::mean_confidence(&subs),
            reasoning: FALLBACK_REASONING.to_string(),
            target_price: None,
            stop_loss: None,
            parse_source: ParseSource::Default,
            consistency: Consistency::NotChecked,
        };
        Self {
            is_fallback: true,
            ..Self::new(position, subs, verdict)
        }
    }

    pub fn sub_analyses(&self) -> SubAnalyses {
        SubAnalyses {
            technical: self.technical.clone(),
            sentiment: self.sentiment.clone(),
            event: self.event.clone(),
            risk: self.risk.clone(),
        }
    }
}
