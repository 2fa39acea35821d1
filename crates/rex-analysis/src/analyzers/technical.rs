//! Technical sub-analysis: trend, signals and score from price history

use tracing::debug;

use super::clamp_unit;
use crate::indicators::{PriceSeries, calculate_indicators, detect_patterns, round_to};
use crate::models::{TechnicalAnalysis, TrendDirection};

/// Closes needed for a real technical read
pub const MIN_HISTORY: usize = 20;

const TREND_WEIGHT: f64 = 0.15;
const RSI_WEIGHT: f64 = 0.1;
const MACD_WEIGHT: f64 = 0.05;
const PATTERN_WEIGHT: f64 = 0.05;
const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const SHORT_HISTORY_CONFIDENCE: f64 = 0.3;

/// Classify price against the 20 and 50 day averages
pub fn classify_trend(price: f64, sma_20: f64, sma_50: f64) -> TrendDirection {
    if price > sma_20 && sma_20 > sma_50 {
        TrendDirection::Bullish
    } else if price < sma_20 && sma_20 < sma_50 {
        TrendDirection::Bearish
    } else {
        TrendDirection::Neutral
    }
}

/// Confidence grows with history, saturating at 200 bars
fn history_confidence(len: usize) -> f64 {
    0.4 + 0.5 * (len.min(200) as f64 / 200.0)
}

pub fn analyze_technical(series: &PriceSeries) -> TechnicalAnalysis {
    let indicators = calculate_indicators(series);

    let (Some(price), Some(sma_20)) = (series.last_close(), indicators.sma_20()) else {
        return TechnicalAnalysis {
            indicators,
            confidence: SHORT_HISTORY_CONFIDENCE,
            summary: format!(
                "Insufficient price history ({} bars) for technical analysis",
                series.len()
            ),
            ..TechnicalAnalysis::default_for_missing_data()
        };
    };
    let sma_50 = indicators.sma_50().unwrap_or(sma_20);
    let trend = classify_trend(price, sma_20, sma_50);

    let mut score = 0.5;
    let mut buy_signals = Vec::new();
    let mut sell_signals = Vec::new();

    match trend {
        TrendDirection::Bullish => {
            score += TREND_WEIGHT;
            buy_signals.push("Price above rising moving averages".to_string());
        }
        TrendDirection::Bearish => {
            score -= TREND_WEIGHT;
            sell_signals.push("Price below falling moving averages".to_string());
        }
        TrendDirection::Neutral => {}
    }

    if let Some(rsi) = indicators.rsi() {
        if rsi < RSI_OVERSOLD {
            score += RSI_WEIGHT;
            buy_signals.push(format!("RSI oversold ({rsi:.1})"));
        } else if rsi > RSI_OVERBOUGHT {
            score -= RSI_WEIGHT;
            sell_signals.push(format!("RSI overbought ({rsi:.1})"));
        }
    }

    if let Some(macd) = indicators.macd() {
        if macd > 0.0 {
            score += MACD_WEIGHT;
            buy_signals.push("MACD positive".to_string());
        } else if macd < 0.0 {
            score -= MACD_WEIGHT;
            sell_signals.push("MACD negative".to_string());
        }
    }

    if let Some(lower) = indicators.get("bb_lower") {
        if price < lower {
            buy_signals.push("Price below lower Bollinger band".to_string());
        }
    }
    if let Some(upper) = indicators.get("bb_upper") {
        if price > upper {
            sell_signals.push("Price above upper Bollinger band".to_string());
        }
    }

    let patterns = detect_patterns(&series.closes);
    for pattern in &patterns {
        if pattern.is_bullish() {
            score += PATTERN_WEIGHT;
            buy_signals.push(pattern.label().to_string());
        } else {
            score -= PATTERN_WEIGHT;
            sell_signals.push(pattern.label().to_string());
        }
    }

    let technical_score = round_to(clamp_unit(score), 4);
    debug!(
        "Technical score {:.4} ({} trend, {} buy / {} sell signals)",
        technical_score,
        trend,
        buy_signals.len(),
        sell_signals.len()
    );

    let summary = format!(
        "{} trend at {:.2} vs SMA20 {:.2}; {} buy and {} sell signals",
        trend,
        price,
        sma_20,
        buy_signals.len(),
        sell_signals.len()
    );

    TechnicalAnalysis {
        support_level: indicators.get("support_level"),
        resistance_level: indicators.get("resistance_level"),
        indicators,
        trend,
        chart_patterns: patterns,
        buy_signals,
        sell_signals,
        technical_score,
        confidence: round_to(history_confidence(series.len()), 4),
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::ChartPattern;

    #[test]
    fn test_classify_trend() {
        assert_eq!(classify_trend(110.0, 105.0, 100.0), TrendDirection::Bullish);
        assert_eq!(classify_trend(90.0, 95.0, 100.0), TrendDirection::Bearish);
        assert_eq!(classify_trend(100.0, 105.0, 100.0), TrendDirection::Neutral);
        // Missing SMA50 falls back to SMA20, which can never be strictly ordered
        assert_eq!(classify_trend(110.0, 105.0, 105.0), TrendDirection::Neutral);
    }

    #[test]
    fn test_short_history_is_neutral() {
        let series = PriceSeries::from_closes((1..=19).map(f64::from).collect());
        let analysis = analyze_technical(&series);

        assert_eq!(analysis.trend, TrendDirection::Neutral);
        assert_eq!(analysis.technical_score, 0.5);
        assert_eq!(analysis.confidence, SHORT_HISTORY_CONFIDENCE);
        assert!(analysis.buy_signals.is_empty());
    }

    #[test]
    fn test_steady_rally_scores_high() {
        let series = PriceSeries::from_closes((1..=60).map(|i| 100.0 + f64::from(i)).collect());
        let analysis = analyze_technical(&series);

        assert_eq!(analysis.trend, TrendDirection::Bullish);
        assert!(analysis.chart_patterns.contains(&ChartPattern::GoldenCross));
        assert!(analysis.sell_signals.iter().any(|s| s.starts_with("RSI overbought")));
        // 0.5 + trend 0.15 - rsi 0.1 + macd 0.05 + three bullish patterns
        assert_eq!(analysis.technical_score, 0.75);
        assert_eq!(analysis.confidence, 0.55);
    }

    #[test]
    fn test_steady_decline_scores_low() {
        let series = PriceSeries::from_closes((1..=60).rev().map(|i| 100.0 + f64::from(i)).collect());
        let analysis = analyze_technical(&series);

        assert_eq!(analysis.trend, TrendDirection::Bearish);
        assert_eq!(analysis.technical_score, 0.25);
        assert!(analysis.technical_score >= 0.0);
    }

    #[test]
    fn test_confidence_saturates() {
        assert_eq!(history_confidence(200), 0.9);
        assert_eq!(history_confidence(1_000), 0.9);
    }
}
