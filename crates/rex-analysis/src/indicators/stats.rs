//! Return and risk statistics

use serde::{Deserialize, Serialize};

use super::round_to;

const TRADING_DAYS: f64 = 252.0;

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1)
pub(crate) fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Day-over-day simple returns, skipping zero denominators
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Sample stdev of simple returns over the whole series
pub fn volatility(prices: &[f64]) -> f64 {
    let returns = simple_returns(prices);
    if returns.len() < 2 {
        return 0.0;
    }
    round_to(sample_stdev(&returns), 6)
}

/// Running-maximum drawdown, as negative fractions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Drawdown {
    pub max: f64,
    pub current: f64,
}

pub fn drawdown(prices: &[f64]) -> Drawdown {
    if prices.len() < 2 {
        return Drawdown::default();
    }

    let mut peak = prices[0];
    let mut worst = 0.0_f64;
    let mut current = 0.0;
    for &price in prices {
        peak = peak.max(price);
        current = if peak > 0.0 { (price - peak) / peak } else { 0.0 };
        worst = worst.min(current);
    }

    Drawdown {
        max: round_to(worst, 4),
        current: round_to(current, 4),
    }
}

/// Annualised Sharpe ratio from daily returns
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let sd = sample_stdev(returns);
    if sd == 0.0 {
        return 0.0;
    }
    let excess = mean(returns) - risk_free_rate / TRADING_DAYS;
    round_to(excess / sd * TRADING_DAYS.sqrt(), 2)
}

/// Pearson correlation of the two series' simple returns
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 3 {
        return 0.0;
    }
    let ra = simple_returns(a);
    let rb = simple_returns(b);
    if ra.len() != rb.len() || ra.len() < 2 {
        return 0.0;
    }

    let (ma, mb) = (mean(&ra), mean(&rb));
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in ra.iter().zip(&rb) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }
    if va == 0.0 || vb == 0.0 {
        return 0.0;
    }
    round_to(cov / (va.sqrt() * vb.sqrt()), 3)
}

/// Distribution statistics of a return series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatistics {
    pub mean_return: f64,
    pub volatility: f64,
    pub downside_deviation: f64,
    pub var_95: f64,
    pub max_consecutive_losses: usize,
}

pub fn return_statistics(returns: &[f64]) -> Option<ReturnStatistics> {
    if returns.len() < 2 {
        return None;
    }

    let negative: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();

    let mut sorted = returns.to_vec();
    sorted.sort_by(f64::total_cmp);
    // Historical VaR needs a reasonable sample, otherwise take the worst day
    let var_95 = if sorted.len() > 20 {
        sorted[(0.05 * sorted.len() as f64) as usize]
    } else {
        sorted[0]
    };

    let mut run = 0;
    let mut max_run = 0;
    for r in returns {
        if *r < 0.0 {
            run += 1;
            max_run = max_run.max(run);
        } else {
            run = 0;
        }
    }

    Some(ReturnStatistics {
        mean_return: round_to(mean(returns), 6),
        volatility: round_to(sample_stdev(returns), 6),
        downside_deviation: round_to(sample_stdev(&negative), 6),
        var_95: round_to(var_95, 6),
        max_consecutive_losses: max_run,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
}

/// Volume-weighted price and recent volume trend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub vwap: f64,
    pub avg_volume: f64,
    pub trend: VolumeTrend,
    pub volume_ratio: f64,
}

/// Requires at least 10 aligned volume/price points with non-zero volume
pub fn volume_profile(volumes: &[f64], prices: &[f64]) -> Option<VolumeProfile> {
    if volumes.len() != prices.len() || volumes.len() < 10 {
        return None;
    }
    let total: f64 = volumes.iter().sum();
    if total == 0.0 {
        return None;
    }

    let vwap = prices.iter().zip(volumes).map(|(p, v)| p * v).sum::<f64>() / total;
    let split = volumes.len() - 5;
    let recent = mean(&volumes[split..]);
    let historical = mean(&volumes[..split]);

    Some(VolumeProfile {
        vwap: round_to(vwap, 2),
        avg_volume: mean(volumes).round(),
        trend: if recent > historical {
            VolumeTrend::Increasing
        } else {
            VolumeTrend::Decreasing
        },
        volume_ratio: if historical > 0.0 {
            round_to(recent / historical, 2)
        } else {
            1.0
        },
    })
}

/// How concentrated a set of holdings is
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationMetrics {
    pub total_value: f64,
    pub positions: usize,
    pub herfindahl_index: f64,
    pub effective_holdings: f64,
    pub max_weight: f64,
    pub top_5_concentration: f64,
}

/// Concentration of holdings given their market values
pub fn concentration_metrics(values: &[f64]) -> Option<ConcentrationMetrics> {
    let total: f64 = values.iter().sum();
    if values.is_empty() || total <= 0.0 {
        return None;
    }

    let mut weights: Vec<f64> = values.iter().map(|v| v / total).collect();
    weights.sort_by(|a, b| b.total_cmp(a));
    let hhi: f64 = weights.iter().map(|w| w * w).sum();

    Some(ConcentrationMetrics {
        total_value: total,
        positions: values.len(),
        herfindahl_index: round_to(hhi, 4),
        effective_holdings: if hhi > 0.0 { round_to(1.0 / hhi, 2) } else { 0.0 },
        max_weight: round_to(weights[0], 4),
        top_5_concentration: round_to(weights.iter().take(5).sum(), 4),
    })
}
