//! Risk sub-analysis
//!
//! The score blends three components, each normalized to [0, 1]:
//! concentration (portfolio weight against a 25% ceiling), annualized
//! volatility (against 80%) and absolute beta (against 2.0). A component
//! whose input is unknown counts as 0.5.

use rex_core::AssetClass;

use super::clamp_unit;
use crate::indicators::{
    PriceSeries, correlation, drawdown, mean, round_to, sharpe_ratio, simple_returns, volatility,
};
use crate::models::{RiskAssessment, RiskLevel, RiskMetrics};

const CONCENTRATION_WEIGHT: f64 = 0.4;
const VOLATILITY_WEIGHT: f64 = 0.4;
const BETA_WEIGHT: f64 = 0.2;

const CONCENTRATION_CEILING: f64 = 0.25;
const VOLATILITY_CEILING: f64 = 0.8;
const BETA_CEILING: f64 = 2.0;
const UNKNOWN_COMPONENT: f64 = 0.5;

const TRADING_DAYS: f64 = 252.0;

/// Data available for one risk assessment
#[derive(Debug, Clone, Copy)]
pub struct RiskInputs<'a> {
    pub series: &'a PriceSeries,
    pub asset_class: AssetClass,
    pub beta: Option<f64>,
    /// Fraction of total portfolio value
    pub portfolio_weight: Option<f64>,
    pub benchmark: Option<&'a PriceSeries>,
    pub risk_free_rate: f64,
}

impl<'a> RiskInputs<'a> {
    pub fn new(series: &'a PriceSeries, asset_class: AssetClass) -> Self {
        Self {
            series,
            asset_class,
            beta: None,
            portfolio_weight: None,
            benchmark: None,
            risk_free_rate: 0.02,
        }
    }
}

fn tail_aligned<'s>(a: &'s [f64], b: &'s [f64]) -> (&'s [f64], &'s [f64]) {
    let n = a.len().min(b.len());
    (&a[a.len() - n..], &b[b.len() - n..])
}

pub fn assess_risk(inputs: &RiskInputs<'_>) -> RiskAssessment {
    let closes = &inputs.series.closes;
    let returns = simple_returns(closes);

    let daily_vol = (returns.len() >= 2).then(|| volatility(closes));
    let annual_vol = daily_vol.map(|v| round_to(v * TRADING_DAYS.sqrt(), 4));
    let dd = (closes.len() >= 2).then(|| drawdown(closes));

    let market_correlation = inputs.benchmark.and_then(|bench| {
        let (a, b) = tail_aligned(closes, &bench.closes);
        (a.len() >= 3).then(|| correlation(a, b))
    });

    let metrics = RiskMetrics {
        price_volatility: daily_vol,
        annualized_volatility: annual_vol,
        beta: inputs.beta,
        max_drawdown: dd.map(|d| d.max),
        current_drawdown: dd.map(|d| d.current),
        sharpe_ratio: (returns.len() >= 2).then(|| sharpe_ratio(&returns, inputs.risk_free_rate)),
        avg_volume: (!inputs.series.volumes.is_empty())
            .then(|| mean(&inputs.series.volumes).round()),
        market_correlation,
    };

    let concentration = inputs
        .portfolio_weight
        .map_or(UNKNOWN_COMPONENT, |w| clamp_unit(w / CONCENTRATION_CEILING));
    let vol_component = annual_vol.map_or(UNKNOWN_COMPONENT, |v| clamp_unit(v / VOLATILITY_CEILING));
    let beta_component = inputs
        .beta
        .map_or(UNKNOWN_COMPONENT, |b| clamp_unit(b.abs() / BETA_CEILING));

    let score = round_to(
        clamp_unit(
            CONCENTRATION_WEIGHT * concentration
                + VOLATILITY_WEIGHT * vol_component
                + BETA_WEIGHT * beta_component,
        ),
        4,
    );
    let level = RiskLevel::from_score(score);

    let mut risk_factors = Vec::new();
    let mut mitigation_strategies = Vec::new();

    if let Some(weight) = inputs.portfolio_weight {
        if weight > 0.2 {
            risk_factors.push(format!(
                "High concentration: {:.1}% of portfolio",
                weight * 100.0
            ));
            mitigation_strategies.push("Consider trimming the position".to_string());
        }
    }
    if let Some(vol) = annual_vol {
        if vol > 0.5 {
            risk_factors.push(format!("High volatility: {:.0}% annualized", vol * 100.0));
            mitigation_strategies.push("Size the position for wider swings".to_string());
        }
    }
    if let Some(beta) = inputs.beta {
        if beta > 1.5 {
            risk_factors.push(format!("High beta ({beta:.2})"));
            mitigation_strategies.push("Hedge against broad market moves".to_string());
        }
    }
    if let Some(max) = metrics.max_drawdown {
        if max < -0.2 {
            risk_factors.push(format!("Deep drawdown ({:.1}%)", max * 100.0));
            mitigation_strategies.push("Use a stop loss".to_string());
        }
    }
    if inputs.asset_class == AssetClass::Crypto {
        risk_factors.push("Crypto asset with limited fundamentals".to_string());
    }

    let known = [
        closes.len() >= 20,
        inputs.beta.is_some(),
        inputs.portfolio_weight.is_some(),
    ]
    .into_iter()
    .filter(|k| *k)
    .count();
    let confidence = round_to(0.5 + 0.1 * known as f64, 4);

    let summary = if risk_factors.is_empty() {
        format!("{level} risk (score {score:.2}) with no major risk factors")
    } else {
        format!(
            "{level} risk (score {score:.2}): {}",
            risk_factors.join("; ")
        )
    };

    RiskAssessment {
        level,
        score,
        metrics,
        risk_factors,
        mitigation_strategies,
        portfolio_weight: inputs.portfolio_weight,
        diversification_impact: None,
        summary,
        confidence,
    }
}
