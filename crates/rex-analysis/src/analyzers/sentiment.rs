//! Sentiment sub-analysis

use crate::indicators::round_to;
use crate::models::{SentimentAnalysis, SentimentLevel};
use crate::providers::SentimentReport;

const BASE_CONFIDENCE: f64 = 0.4;
const CONFIDENCE_PER_SOURCE: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 0.9;

pub fn analyze_sentiment(report: &SentimentReport) -> SentimentAnalysis {
    let score = if report.score.is_finite() {
        report.score.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let level = report
        .level
        .unwrap_or_else(|| SentimentLevel::from_score(score));
    let confidence =
        (BASE_CONFIDENCE + CONFIDENCE_PER_SOURCE * report.sources as f64).min(MAX_CONFIDENCE);

    let summary = if report.sources == 0 {
        "No recent coverage found; sentiment treated as neutral".to_string()
    } else {
        format!(
            "{} sentiment ({:+.2}) across {} sources: {} positive, {} negative mentions",
            level,
            score,
            report.sources,
            report.positive_mentions,
            report.negative_mentions
        )
    };

    SentimentAnalysis {
        level,
        score: round_to(score, 4),
        source_count: report.sources,
        positive_mentions: report.positive_mentions,
        negative_mentions: report.negative_mentions,
        headlines: report.headlines.iter().take(5).cloned().collect(),
        confidence: round_to(confidence, 4),
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(score: f64, sources: usize) -> SentimentReport {
        SentimentReport {
            score,
            sources,
            ..SentimentReport::default()
        }
    }

    #[test]
    fn test_level_from_score() {
        assert_eq!(analyze_sentiment(&report(0.7, 3)).level, SentimentLevel::VeryPositive);
        assert_eq!(analyze_sentiment(&report(0.3, 3)).level, SentimentLevel::Positive);
        assert_eq!(analyze_sentiment(&report(-0.1, 3)).level, SentimentLevel::Neutral);
        assert_eq!(analyze_sentiment(&report(-0.4, 3)).level, SentimentLevel::Negative);
        assert_eq!(analyze_sentiment(&report(-2.0, 3)).score, -1.0);
    }

    #[test]
    fn test_provider_level_wins() {
        let mut r = report(0.0, 1);
        r.level = Some(SentimentLevel::Positive);
        assert_eq!(analyze_sentiment(&r).level, SentimentLevel::Positive);
    }

    #[test]
    fn test_confidence_grows_with_sources() {
        assert_eq!(analyze_sentiment(&report(0.0, 0)).confidence, 0.4);
        assert_eq!(analyze_sentiment(&report(0.0, 3)).confidence, 0.7);
        assert_eq!(analyze_sentiment(&report(0.0, 20)).confidence, 0.9);
    }

    #[test]
    fn test_nan_score_is_neutral() {
        let analysis = analyze_sentiment(&report(f64::NAN, 2));
        assert_eq!(analysis.score, 0.0);
        assert_eq!(analysis.level, SentimentLevel::Neutral);
    }
}
