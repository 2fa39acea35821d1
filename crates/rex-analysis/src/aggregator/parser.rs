//! Parser for generated recommendation text
//!
//! Tries the delimited block first, then a keyword scan, and always ends in
//! a value. Malformed text lowers the quality of the result but never
//! produces an error.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::Recommendation;

/// Confidence used when nothing at all could be parsed
pub const UNPARSED_CONFIDENCE: f64 = 0.6;

const BLOCK_PATTERN: &str =
    r"(?is)=== INVESTMENT RECOMMENDATION ===(.*?)=== END RECOMMENDATION ===";

/// Which extractor produced a [`ParsedRecommendation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseSource {
    /// Delimited `=== INVESTMENT RECOMMENDATION ===` block
    Structured,
    /// Keyword scan over free text
    Heuristic,
    /// Nothing recognisable; HOLD at a fixed confidence
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecommendation {
    pub recommendation: Recommendation,
    /// Stated confidence, already normalised to [0, 1]
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
    pub target_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub source: ParseSource,
}

impl ParsedRecommendation {
    pub fn unparsed() -> Self {
        Self {
            recommendation: Recommendation::Hold,
            confidence: Some(UNPARSED_CONFIDENCE),
            reasoning: None,
            target_price: None,
            stop_loss: None,
            source: ParseSource::Default,
        }
    }
}

/// Percent figures (anything above 1) are scaled down, then clamped
pub fn normalize_confidence(value: f64) -> f64 {
    let value = if value > 1.0 { value / 100.0 } else { value };
    value.clamp(0.0, 1.0)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.trim().chars().take(max_chars).collect()
}

/// Compiled extractors for recommendation text
#[derive(Debug, Clone)]
pub struct RecommendationParser {
    block: Regex,
    final_recommendation: Regex,
    confidence_score: Regex,
    structured_reasoning: Regex,
    target_price: Regex,
    stop_loss: Regex,
    keyword_buy: Regex,
    keyword_sell: Regex,
    keyword_hold: Regex,
    loose_confidence: Vec<Regex>,
    loose_reasoning: Vec<Regex>,
    max_reasoning_chars: usize,
}

impl RecommendationParser {
    pub fn new(max_reasoning_chars: usize) -> Result<Self, regex::Error> {
        let compile_all = |patterns: &[&str]| -> Result<Vec<Regex>, regex::Error> {
            patterns.iter().map(|p| Regex::new(p)).collect()
        };

        Ok(Self {
            block: Regex::new(BLOCK_PATTERN)?,
            final_recommendation: Regex::new(r"(?i)Final Recommendation:\s*\**\s*(BUY|SELL|HOLD)")?,
            confidence_score: Regex::new(r"(?i)Confidence Score:\s*(\d+(?:\.\d+)?)\s*%?")?,
            structured_reasoning: Regex::new(
                r"(?is)Reasoning:\s*(.+?)\s*(?:\n\s*(?:Target Price|Stop Loss)\s*:|\z)",
            )?,
            target_price: Regex::new(r"(?i)Target Price:\s*\$?\s*(\d[\d,]*(?:\.\d+)?)")?,
            stop_loss: Regex::new(r"(?i)Stop Loss:\s*\$?\s*(\d[\d,]*(?:\.\d+)?)")?,
            keyword_buy: Regex::new(r"(?i)\bbuy\b")?,
            keyword_sell: Regex::new(r"(?i)\bsell\b")?,
            keyword_hold: Regex::new(r"(?i)\bhold\b")?,
            loose_confidence: compile_all(&[
                r"(?i)confidence\s*score[:\s]*(\d+(?:\.\d+)?)%?",
                r"(?i)overall\s*confidence[:\s]*(\d+(?:\.\d+)?)%?",
                r"(?i)confidence[:\s]*(\d+(?:\.\d+)?)%?",
                r"(?i)(\d+(?:\.\d+)?)%?\s*confidence",
            ])?,
            loose_reasoning: compile_all(&[
                r"(?is)reasoning[:\s]*(.+?)(?:\n\s*\n|\z)",
                r"(?is)recommendation[:\s]*(.+?)(?:\n\s*\n|\z)",
                r"(?is)analysis[:\s]*(.+?)(?:\n\s*\n|\z)",
            ])?,
            max_reasoning_chars,
        })
    }

    fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    fn capture_number(re: &Regex, text: &str) -> Option<f64> {
        Self::capture(re, text)
            .and_then(|raw| raw.replace(',', "").parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// Parse generated text; total over every input
    pub fn parse(&self, text: &str) -> ParsedRecommendation {
        if let Some(block) = Self::capture(&self.block, text) {
            return self.parse_structured(block);
        }
        self.parse_heuristic(text)
            .unwrap_or_else(ParsedRecommendation::unparsed)
    }

    fn parse_structured(&self, block: &str) -> ParsedRecommendation {
        let recommendation = Self::capture(&self.final_recommendation, block)
            .and_then(Recommendation::parse)
            .unwrap_or(Recommendation::Hold);

        ParsedRecommendation {
            recommendation,
            confidence: Self::capture_number(&self.confidence_score, block).map(normalize_confidence),
            reasoning: Self::capture(&self.structured_reasoning, block)
                .map(|r| truncate_chars(r, self.max_reasoning_chars))
                .filter(|r| !r.is_empty()),
            target_price: Self::capture_number(&self.target_price, block),
            stop_loss: Self::capture_number(&self.stop_loss, block),
            source: ParseSource::Structured,
        }
    }

    fn parse_heuristic(&self, text: &str) -> Option<ParsedRecommendation> {
        let recommendation = if self.keyword_buy.is_match(text) {
            Some(Recommendation::Buy)
        } else if self.keyword_sell.is_match(text) {
            Some(Recommendation::Sell)
        } else if self.keyword_hold.is_match(text) {
            Some(Recommendation::Hold)
        } else {
            None
        };

        let confidence = self
            .loose_confidence
            .iter()
            .find_map(|re| Self::capture_number(re, text))
            .map(normalize_confidence);

        let reasoning = self
            .loose_reasoning
            .iter()
            .find_map(|re| Self::capture(re, text))
            .map(|r| truncate_chars(r, self.max_reasoning_chars))
            .filter(|r| !r.is_empty());

        if recommendation.is_none() && confidence.is_none() && reasoning.is_none() {
            return None;
        }

        Some(ParsedRecommendation {
            recommendation: recommendation.unwrap_or(Recommendation::Hold),
            confidence,
            reasoning,
            target_price: Self::capture_number(&self.target_price, text),
            stop_loss: Self::capture_number(&self.stop_loss, text),
            source: ParseSource::Heuristic,
        })
    }
}
