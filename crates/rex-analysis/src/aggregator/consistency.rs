//! Recommendation vs. reasoning consistency check

use serde::{Deserialize, Serialize};

use crate::models::Recommendation;

/// Confidence removed when the reasoning argues against the call
pub const CONSISTENCY_PENALTY: f64 = 0.2;

/// The penalty never pushes confidence below this
pub const MIN_PENALIZED_CONFIDENCE: f64 = 0.3;

const BULLISH_KEYWORDS: [&str; 6] = ["buy", "strong", "growth", "positive", "upside", "opportunity"];
const BEARISH_KEYWORDS: [&str; 7] = [
    "sell", "avoid", "negative", "decline", "drop", "risk", "concern",
];

/// Outcome of the keyword check; advisory only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Consistency {
    /// HOLD calls and placeholder analyses are not checked
    NotChecked,
    Consistent { aligned: usize, contradicting: usize },
    Contradicted { aligned: usize, contradicting: usize },
}

impl Consistency {
    pub fn is_contradicted(self) -> bool {
        matches!(self, Self::Contradicted { .. })
    }
}

fn keyword_hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| text.contains(*k)).count()
}

/// Count aligned and contradicting keywords in the reasoning
pub fn check(recommendation: Recommendation, reasoning: &str) -> Consistency {
    let text = reasoning.to_lowercase();
    let bullish = keyword_hits(&text, &BULLISH_KEYWORDS);
    let bearish = keyword_hits(&text, &BEARISH_KEYWORDS);

    let (aligned, contradicting) = match recommendation {
        Recommendation::Buy => (bullish, bearish),
        Recommendation::Sell => (bearish, bullish),
        Recommendation::Hold => return Consistency::NotChecked,
    };

    if contradicting > aligned {
        Consistency::Contradicted {
            aligned,
            contradicting,
        }
    } else {
        Consistency::Consistent {
            aligned,
            contradicting,
        }
    }
}

/// Lower confidence by the penalty, floored, and never raised
pub fn apply_penalty(confidence: f64) -> f64 {
    (confidence - CONSISTENCY_PENALTY)
        .max(MIN_PENALIZED_CONFIDENCE)
        .min(confidence)
}
