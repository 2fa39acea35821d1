//! Technical indicator calculations over a price series
//!
//! Everything here is pure. Functions return `None` (or leave a key out of
//! [`IndicatorSet`]) when the history is too short, instead of failing.

mod patterns;
mod stats;

pub use patterns::{ChartPattern, detect_patterns};
pub use stats::{
    ConcentrationMetrics, Drawdown, ReturnStatistics, VolumeProfile, VolumeTrend,
    concentration_metrics, correlation, drawdown, mean, return_statistics, sharpe_ratio,
    simple_returns, volatility, volume_profile,
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ta::{
    Next,
    indicators::{BollingerBands, SimpleMovingAverage},
};

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_MULTIPLIER: f64 = 2.0;
pub const SUPPORT_RESISTANCE_WINDOW: usize = 20;
pub const VOLUME_WINDOW: usize = 10;

/// Neutral RSI reported when there is not enough history
pub const NEUTRAL_RSI: f64 = 50.0;

/// One daily OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Positive close inside a consistent high/low range
    pub fn is_valid(&self) -> bool {
        self.close.is_finite()
            && self.close > 0.0
            && self.high >= self.low
            && self.high >= self.close
            && self.low <= self.close
    }
}

/// Drop bars with a non-positive close or an inconsistent high/low range
pub fn normalize_bars(bars: Vec<PriceBar>) -> Vec<PriceBar> {
    let before = bars.len();
    let cleaned: Vec<PriceBar> = bars.into_iter().filter(PriceBar::is_valid).collect();
    if cleaned.len() < before {
        tracing::warn!("Skipped {} invalid price bars", before - cleaned.len());
    }
    cleaned
}

/// Column view of a price history, oldest first
///
/// Highs, lows and volumes may be empty when the source only supplies
/// closes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub closes: Vec<f64>,
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl PriceSeries {
    pub fn from_bars(bars: &[PriceBar]) -> Self {
        Self {
            closes: bars.iter().map(|b| b.close).collect(),
            highs: bars.iter().map(|b| b.high).collect(),
            lows: bars.iter().map(|b| b.low).collect(),
            volumes: bars.iter().map(|b| b.volume).collect(),
        }
    }

    pub fn from_closes(closes: Vec<f64>) -> Self {
        Self {
            closes,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.closes.last().copied()
    }
}

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Mean of the last `period` values
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let mut indicator = SimpleMovingAverage::new(period).ok()?;
    values[values.len() - period..]
        .iter()
        .fold(None, |_, &v| Some(indicator.next(v)))
}

/// Exponential moving average seeded with the SMA of the first `period` values
///
/// Shorter inputs fall back to the plain mean.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if values.is_empty() || period == 0 {
        return None;
    }
    if values.len() < period {
        return Some(mean(values));
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed = mean(&values[..period]);
    Some(
        values[period..]
            .iter()
            .fold(seed, |ema, &price| price * multiplier + ema * (1.0 - multiplier)),
    )
}

/// Relative strength index from simple averages of the last 14 deltas
pub fn rsi(closes: &[f64]) -> f64 {
    if closes.len() < RSI_PERIOD + 1 {
        return NEUTRAL_RSI;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let recent = &deltas[deltas.len() - RSI_PERIOD..];
    let avg_gain = recent.iter().map(|d| d.max(0.0)).sum::<f64>() / RSI_PERIOD as f64;
    let avg_loss = recent.iter().map(|d| (-d).max(0.0)).sum::<f64>() / RSI_PERIOD as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    round_to(100.0 - 100.0 / (1.0 + rs), 2)
}

/// MACD line with its signal and histogram
///
/// No MACD history is kept, so the signal equals the line and the histogram
/// is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn macd(closes: &[f64]) -> Option<Macd> {
    if closes.len() < MACD_SLOW {
        return None;
    }
    let line = ema(closes, MACD_FAST)? - ema(closes, MACD_SLOW)?;
    let line = round_to(line, 4);
    Some(Macd {
        macd: line,
        signal: line,
        histogram: round_to(line - line, 4),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger bands (20, ±2σ) over the most recent closes
pub fn bollinger_bands(closes: &[f64]) -> Option<Bands> {
    if closes.len() < BOLLINGER_PERIOD {
        return None;
    }
    let mut bb = BollingerBands::new(BOLLINGER_PERIOD, BOLLINGER_MULTIPLIER).ok()?;
    let out = closes[closes.len() - BOLLINGER_PERIOD..]
        .iter()
        .fold(None, |_, &close| Some(bb.next(close)))?;

    Some(Bands {
        upper: round_to(out.upper, 2),
        middle: round_to(out.average, 2),
        lower: round_to(out.lower, 2),
    })
}

/// Lowest low and highest high over the last 20 bars
///
/// Uses the close series when highs or lows are missing.
pub fn support_resistance(series: &PriceSeries) -> Option<(f64, f64)> {
    let n = series.len();
    if n == 0 {
        return None;
    }
    let window = n.min(SUPPORT_RESISTANCE_WINDOW);
    let tail = |values: &[f64]| -> Vec<f64> {
        if values.len() == n {
            values[n - window..].to_vec()
        } else {
            series.closes[n - window..].to_vec()
        }
    };

    let support = tail(&series.lows).into_iter().fold(f64::INFINITY, f64::min);
    let resistance = tail(&series.highs)
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max);
    Some((round_to(support, 2), round_to(resistance, 2)))
}

/// Named indicator values for one series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorSet {
    values: BTreeMap<String, f64>,
}

impl IndicatorSet {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn sma_20(&self) -> Option<f64> {
        self.get("sma_20")
    }

    pub fn sma_50(&self) -> Option<f64> {
        self.get("sma_50")
    }

    pub fn rsi(&self) -> Option<f64> {
        self.get("rsi")
    }

    pub fn macd(&self) -> Option<f64> {
        self.get("macd")
    }

    pub fn volatility(&self) -> Option<f64> {
        self.get("volatility")
    }
}

/// Compute every indicator the history allows
pub fn calculate_indicators(series: &PriceSeries) -> IndicatorSet {
    let mut set = IndicatorSet::default();
    let closes = &series.closes;
    if closes.len() < 2 {
        return set;
    }

    for period in [20, 50, 200] {
        if let Some(value) = sma(closes, period) {
            set.insert(format!("sma_{period}"), round_to(value, 2));
        }
    }

    set.insert("rsi", rsi(closes));

    if let Some(m) = macd(closes) {
        set.insert("macd", m.macd);
        set.insert("macd_signal", m.signal);
        set.insert("macd_histogram", m.histogram);
    }

    if let Some(bands) = bollinger_bands(closes) {
        set.insert("bb_upper", bands.upper);
        set.insert("bb_middle", bands.middle);
        set.insert("bb_lower", bands.lower);
    }

    set.insert("volatility", volatility(closes));

    if closes.len() >= SUPPORT_RESISTANCE_WINDOW {
        if let Some((support, resistance)) = support_resistance(series) {
            set.insert("support_level", support);
            set.insert("resistance_level", resistance);
        }
    }

    let volumes = &series.volumes;
    if volumes.len() >= VOLUME_WINDOW {
        let avg = mean(&volumes[volumes.len() - VOLUME_WINDOW..]);
        set.insert("volume_avg", round_to(avg, 2));
        let ratio = match volumes.last() {
            Some(last) if avg > 0.0 => last / avg,
            _ => 1.0,
        };
        set.insert("volume_ratio", round_to(ratio, 2));
    }

    set
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Deterministic wavy series drifting upwards
    pub(crate) fn wave(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let x = i as f64;
                100.0 + x * 0.3 + (x / 3.0).sin() * 4.0
            })
            .collect()
    }

    #[test]
    fn test_sma() {
        assert_eq!(sma(&[1.0, 2.0, 3.0, 4.0], 2), Some(3.5));
        assert_eq!(sma(&[1.0, 2.0], 3), None);
        assert_eq!(sma(&[1.0], 0), None);
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        // seed = 2.0, multiplier = 0.5 -> 0.5 * 4 + 0.5 * 2 = 3
        assert_eq!(ema(&[1.0, 2.0, 3.0, 4.0], 3), Some(3.0));
        assert_eq!(ema(&[2.0, 4.0], 5), Some(3.0));
        assert_eq!(ema(&[], 5), None);
    }

    #[test]
    fn test_rsi_neutral_with_short_history() {
        for len in 0..15 {
            assert_eq!(rsi(&wave(len)), NEUTRAL_RSI);
        }
    }

    #[test]
    fn test_rsi_all_gains() {
        let closes: Vec<f64> = (1..=20).map(f64::from).collect();
        assert_eq!(rsi(&closes), 100.0);
    }

    #[test]
    fn test_rsi_bounds() {
        for len in 26..80 {
            let value = rsi(&wave(len));
            assert!((0.0..=100.0).contains(&value), "rsi {value} at {len}");
        }
        let falling: Vec<f64> = (1..=30).rev().map(f64::from).collect();
        assert_eq!(rsi(&falling), 0.0);
    }

    #[test]
    fn test_macd_requires_slow_period() {
        assert!(macd(&wave(25)).is_none());
        let m = macd(&wave(60)).unwrap();
        assert_eq!(m.signal, m.macd);
        assert_eq!(m.histogram, 0.0);
    }

    #[test]
    fn test_bollinger_ordering() {
        for len in 26..80 {
            let bands = bollinger_bands(&wave(len)).unwrap();
            assert!(bands.upper >= bands.middle);
            assert!(bands.middle >= bands.lower);
        }
        assert!(bollinger_bands(&wave(19)).is_none());
    }

    #[test]
    fn test_bollinger_flat_series() {
        let bands = bollinger_bands(&[10.0; 20]).unwrap();
        assert_eq!(bands.upper, 10.0);
        assert_eq!(bands.middle, 10.0);
        assert_eq!(bands.lower, 10.0);
    }

    #[test]
    fn test_support_resistance_uses_highs_and_lows() {
        let mut series = PriceSeries::from_closes(wave(30));
        series.highs = series.closes.iter().map(|c| c + 1.0).collect();
        series.lows = series.closes.iter().map(|c| c - 1.0).collect();

        let (support, resistance) = support_resistance(&series).unwrap();
        let recent = &series.closes[10..];
        let min = recent.iter().copied().fold(f64::INFINITY, f64::min);
        let max = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(support, round_to(min - 1.0, 2));
        assert_eq!(resistance, round_to(max + 1.0, 2));
    }

    #[test]
    fn test_support_resistance_falls_back_to_closes() {
        let series = PriceSeries::from_closes(vec![5.0, 3.0, 8.0]);
        assert_eq!(support_resistance(&series), Some((3.0, 8.0)));
        assert_eq!(support_resistance(&PriceSeries::default()), None);
    }

    #[test]
    fn test_calculate_indicators_partial_history() {
        let set = calculate_indicators(&PriceSeries::from_closes(wave(30)));
        assert!(set.sma_20().is_some());
        assert!(set.sma_50().is_none());
        assert!(!set.contains("sma_200"));
        assert!(set.macd().is_some());
        assert!(set.contains("bb_upper"));
        assert!(set.contains("support_level"));
        assert!(!set.contains("volume_avg"));

        assert!(calculate_indicators(&PriceSeries::from_closes(vec![1.0])).is_empty());
    }

    #[test]
    fn test_calculate_indicators_volume() {
        let mut series = PriceSeries::from_closes(wave(12));
        series.volumes = vec![100.0; 11];
        series.volumes.push(200.0);

        let set = calculate_indicators(&series);
        assert_eq!(set.get("volume_avg"), Some(110.0));
        assert_eq!(set.get("volume_ratio"), Some(1.82));
        assert_eq!(set.rsi(), Some(NEUTRAL_RSI));
    }

    #[test]
    fn test_normalize_bars() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let good = PriceBar {
            date,
            open: 10.0,
            high: 11.0,
            low: 9.0,
            close: 10.5,
            volume: 1_000.0,
        };
        let zero_close = PriceBar { close: 0.0, ..good };
        let inverted = PriceBar {
            high: 8.0,
            ..good
        };

        let cleaned = normalize_bars(vec![good, zero_close, inverted]);
        assert_eq!(cleaned, vec![good]);
    }
}
