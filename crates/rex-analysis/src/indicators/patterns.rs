//! Simple chart pattern detection

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{SUPPORT_RESISTANCE_WINDOW, sma};

const MIN_HISTORY: usize = 10;
const RUN_LENGTH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartPattern {
    /// SMA10 above SMA20
    GoldenCross,
    /// SMA10 below SMA20
    DeathCross,
    Uptrend,
    Downtrend,
    /// Close above the previous 20-bar high
    ResistanceBreakout,
    /// Close below the previous 20-bar low
    SupportBreakdown,
}

impl ChartPattern {
    pub fn is_bullish(self) -> bool {
        matches!(
            self,
            Self::GoldenCross | Self::Uptrend | Self::ResistanceBreakout
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::GoldenCross => "Golden Cross",
            Self::DeathCross => "Death Cross",
            Self::Uptrend => "Uptrend",
            Self::Downtrend => "Downtrend",
            Self::ResistanceBreakout => "Resistance Breakout",
            Self::SupportBreakdown => "Support Breakdown",
        }
    }
}

impl fmt::Display for ChartPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Detect crossover, momentum and breakout signals from closes
pub fn detect_patterns(closes: &[f64]) -> Vec<ChartPattern> {
    let mut patterns = Vec::new();
    if closes.len() < MIN_HISTORY {
        return patterns;
    }

    if let (Some(short), Some(long)) = (sma(closes, 10), sma(closes, 20)) {
        if short > long {
            patterns.push(ChartPattern::GoldenCross);
        } else if short < long {
            patterns.push(ChartPattern::DeathCross);
        }
    }

    let run = &closes[closes.len() - RUN_LENGTH..];
    if run.windows(2).all(|w| w[1] > w[0]) {
        patterns.push(ChartPattern::Uptrend);
    } else if run.windows(2).all(|w| w[1] < w[0]) {
        patterns.push(ChartPattern::Downtrend);
    }

    // The band excludes the latest bar, otherwise it could never be broken
    if closes.len() > SUPPORT_RESISTANCE_WINDOW {
        let (prior, last) = closes.split_at(closes.len() - 1);
        let band = &prior[prior.len() - SUPPORT_RESISTANCE_WINDOW..];
        let high = band.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let low = band.iter().copied().fold(f64::INFINITY, f64::min);
        if last[0] > high {
            patterns.push(ChartPattern::ResistanceBreakout);
        } else if last[0] < low {
            patterns.push(ChartPattern::SupportBreakdown);
        }
    }

    patterns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_history_has_no_patterns() {
        assert!(detect_patterns(&[1.0, 2.0, 3.0]).is_empty());
    }

    #[test]
    fn test_rising_series() {
        let closes: Vec<f64> = (1..=25).map(f64::from).collect();
        let patterns = detect_patterns(&closes);
        assert_eq!(
            patterns,
            vec![
                ChartPattern::GoldenCross,
                ChartPattern::Uptrend,
                ChartPattern::ResistanceBreakout
            ]
        );
        assert!(patterns.iter().all(|p| p.is_bullish()));
    }

    #[test]
    fn test_falling_series() {
        let closes: Vec<f64> = (1..=25).rev().map(f64::from).collect();
        assert_eq!(
            detect_patterns(&closes),
            vec![
                ChartPattern::DeathCross,
                ChartPattern::Downtrend,
                ChartPattern::SupportBreakdown
            ]
        );
    }

    #[test]
    fn test_momentum_only_with_ten_bars() {
        let closes = [5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        assert_eq!(detect_patterns(&closes), vec![ChartPattern::Uptrend]);
    }

    #[test]
    fn test_flat_series() {
        assert!(detect_patterns(&[3.0; 30]).is_empty());
        assert_eq!(ChartPattern::DeathCross.to_string(), "Death Cross");
    }
}
