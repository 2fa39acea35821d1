//! Portfolio-level re-weighting pass
//!
//! Re-derives each analysis' risk level from its share of total portfolio
//! value. Only the risk level, weight and diversification note change; the
//! recommendation and scores are left alone.

use rex_core::Portfolio;
use tracing::{debug, info};

use crate::indicators::{ConcentrationMetrics, concentration_metrics};
use crate::models::{AssetAnalysis, RiskLevel};

pub const HIGH_WEIGHT_THRESHOLD: f64 = 0.20;
pub const MEDIUM_WEIGHT_THRESHOLD: f64 = 0.10;

/// Risk level implied by a portfolio weight (a fraction)
pub fn level_for_weight(weight: f64) -> RiskLevel {
    if weight > HIGH_WEIGHT_THRESHOLD {
        RiskLevel::High
    } else if weight > MEDIUM_WEIGHT_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn diversification_note(weight: f64) -> &'static str {
    if weight > HIGH_WEIGHT_THRESHOLD {
        "concentrated"
    } else if weight > MEDIUM_WEIGHT_THRESHOLD {
        "moderate"
    } else {
        "diversified"
    }
}

/// Annotate analyses with portfolio weights and re-level their risk
pub fn apply_portfolio_weights(analyses: &mut [AssetAnalysis], portfolio: &Portfolio) {
    info!("Analyzing portfolio correlations...");
    let total = portfolio.total_value();
    if total <= 0.0 {
        return;
    }

    for analysis in analyses.iter_mut() {
        let Some(position) = portfolio.position_by_symbol(&analysis.symbol) else {
            debug!("No position found for {}", analysis.symbol);
            continue;
        };
        let weight = position.market_value() / total;

        analysis.risk.portfolio_weight = Some(weight);
        analysis.risk.level = level_for_weight(weight);
        analysis.risk.diversification_impact = Some(diversification_note(weight).to_string());
    }
}

/// Concentration of the portfolio's holdings
pub fn portfolio_concentration(portfolio: &Portfolio) -> Option<ConcentrationMetrics> {
    let values: Vec<f64> = portfolio
        .positions()
        .iter()
        .map(rex_core::Position::market_value)
        .collect();
    concentration_metrics(&values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recommendation;
    use rex_core::Position;

    fn portfolio() -> Portfolio {
        Portfolio::new(vec![
            Position::equity("BIG", 1.0, 500.0).unwrap(),
            Position::equity("MID", 1.0, 150.0).unwrap(),
            Position::crypto("SMALL", 1.0, 100.0).unwrap(),
            Position::equity("REST", 1.0, 250.0).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(level_for_weight(0.25), RiskLevel::High);
        assert_eq!(level_for_weight(0.20), RiskLevel::Medium);
        assert_eq!(level_for_weight(0.15), RiskLevel::Medium);
        assert_eq!(level_for_weight(0.10), RiskLevel::Low);
    }

    #[test]
    fn test_apply_portfolio_weights() {
        let portfolio = portfolio();
        let mut analyses: Vec<AssetAnalysis> = portfolio
            .positions()
            .iter()
            .map(AssetAnalysis::fallback)
            .collect();
        analyses[0].recommendation = Recommendation::Buy;

        apply_portfolio_weights(&mut analyses, &portfolio);

        assert_eq!(analyses[0].risk.level, RiskLevel::High);
        assert_eq!(analyses[0].risk.portfolio_weight, Some(0.5));
        assert_eq!(analyses[0].risk.diversification_impact.as_deref(), Some("concentrated"));
        assert_eq!(analyses[0].recommendation, Recommendation::Buy);

        assert_eq!(analyses[1].risk.level, RiskLevel::Medium);
        assert_eq!(analyses[2].risk.level, RiskLevel::Low);
        assert_eq!(analyses[2].risk.diversification_impact.as_deref(), Some("diversified"));
        assert_eq!(analyses[3].risk.level, RiskLevel::High);
    }

    #[test]
    fn test_only_risk_fields_change() {
        let portfolio = portfolio();
        let mut analyses = vec![AssetAnalysis::fallback(&portfolio.positions()[2])];
        let before = analyses[0].clone();

        apply_portfolio_weights(&mut analyses, &portfolio);

        let after = &analyses[0];
        assert_eq!(after.overall_score, before.overall_score);
        assert_eq!(after.confidence, before.confidence);
        assert_eq!(after.risk.score, before.risk.score);
        assert_ne!(after.risk.level, before.risk.level);
    }

    #[test]
    fn test_portfolio_concentration() {
        let metrics = portfolio_concentration(&portfolio()).unwrap();
        assert_eq!(metrics.positions, 4);
        assert_eq!(metrics.max_weight, 0.5);
        assert!(portfolio_concentration(&Portfolio::empty()).is_none());
    }
}
