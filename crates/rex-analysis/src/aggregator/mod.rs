//! Recommendation aggregation
//!
//! Turns the four sub-analyses plus the generator's free text into one
//! scored verdict. Aggregation is deterministic: the same inputs always
//! produce the same verdict.

mod consistency;
mod parser;

pub use consistency::{
    CONSISTENCY_PENALTY, Consistency, MIN_PENALIZED_CONFIDENCE, apply_penalty, check,
};
pub use parser::{
    ParseSource, ParsedRecommendation, RecommendationParser, UNPARSED_CONFIDENCE,
    normalize_confidence,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AnalyzerConfig;
use crate::error::{AnalysisError, Result};
use crate::indicators::round_to;
use crate::models::{Recommendation, SubAnalyses};

pub const TECHNICAL_WEIGHT: f64 = 0.4;
pub const SENTIMENT_WEIGHT: f64 = 0.3;
pub const RISK_WEIGHT: f64 = 0.3;

/// Confidence used when neither the text nor the sub-analyses supply one
pub const BUY_FALLBACK_CONFIDENCE: f64 = 0.75;
pub const SELL_FALLBACK_CONFIDENCE: f64 = 0.70;
pub const HOLD_FALLBACK_CONFIDENCE: f64 = 0.60;

const MISSING_REASONING: &str = "Default analysis with limited data";

/// Weighted blend of technical, sentiment and inverted risk scores in [0, 1]
pub fn overall_score(subs: &SubAnalyses) -> f64 {
    let sentiment = (subs.sentiment.score + 1.0) / 2.0;
    let score = TECHNICAL_WEIGHT * subs.technical.technical_score
        + SENTIMENT_WEIGHT * sentiment
        + RISK_WEIGHT * (1.0 - subs.risk.score);
    round_to(score.clamp(0.0, 1.0), 4)
}

/// Mean of the technical, sentiment and risk confidences
pub fn mean_confidence(subs: &SubAnalyses) -> f64 {
    let sum = subs.technical.confidence + subs.sentiment.confidence + subs.risk.confidence;
    round_to(sum / 3.0, 4)
}

pub fn fallback_confidence(recommendation: Recommendation) -> f64 {
    match recommendation {
        Recommendation::Buy => BUY_FALLBACK_CONFIDENCE,
        Recommendation::Sell => SELL_FALLBACK_CONFIDENCE,
        Recommendation::Hold => HOLD_FALLBACK_CONFIDENCE,
    }
}

/// Final scored call for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub recommendation: Recommendation,
    pub overall_score: f64,
    pub overall_confidence: f64,
    pub reasoning: String,
    pub target_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub parse_source: ParseSource,
    pub consistency: Consistency,
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    parser: RecommendationParser,
}

impl Aggregator {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let parser = RecommendationParser::new(config.max_reasoning_chars)
            .map_err(|e| AnalysisError::Config(format!("invalid recommendation pattern: {e}")))?;
        Ok(Self { parser })
    }

    pub fn aggregate(&self, subs: &SubAnalyses, generated_text: &str) -> Verdict {
        let parsed = self.parser.parse(generated_text);
        let recommendation = parsed.recommendation;

        let confidence = parsed
            .confidence
            .filter(|c| *c > 0.0)
            .unwrap_or_else(|| {
                let mean = mean_confidence(subs);
                if mean > 0.0 {
                    mean
                } else {
                    fallback_confidence(recommendation)
                }
            });

        let reasoning = parsed
            .reasoning
            .unwrap_or_else(|| MISSING_REASONING.to_string());

        let consistency = check(recommendation, &reasoning);
        let overall_confidence = if let Consistency::Contradicted {
            aligned,
            contradicting,
        } = consistency
        {
            warn!(
                "Potential inconsistency: {} recommendation but reasoning leans the other way ({} aligned, {} contradicting keywords)",
                recommendation, aligned, contradicting
            );
            apply_penalty(confidence)
        } else {
            confidence
        };

        let verdict = Verdict {
            recommendation,
            overall_score: overall_score(subs),
            overall_confidence: round_to(overall_confidence, 4),
            reasoning,
            target_price: parsed.target_price,
            stop_loss: parsed.stop_loss,
            parse_source: parsed.source,
            consistency,
        };
        debug!(
            "Aggregated {} (score {:.4}, confidence {:.4}, parsed from {:?})",
            verdict.recommendation,
            verdict.overall_score,
            verdict.overall_confidence,
            verdict.parse_source
        );
        verdict
    }
}
