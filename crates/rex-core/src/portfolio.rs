//! Portfolio snapshot

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{PortfolioError, Result};
use crate::position::{AssetClass, Position};

/// Ordered, read-only collection of positions
///
/// `total_value` is the sum of position market values and is computed once
/// at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    positions: Vec<Position>,
    total_value: f64,
}

impl Portfolio {
    /// Build a portfolio, rejecting duplicate symbols
    pub fn new(positions: Vec<Position>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(positions.len());
        for position in &positions {
            if !seen.insert(position.symbol()) {
                return Err(PortfolioError::DuplicateSymbol(position.symbol().to_string()));
            }
        }

        let total_value = positions.iter().map(Position::market_value).sum();
        Ok(Self {
            positions,
            total_value,
        })
    }

    /// Empty portfolio
    pub fn empty() -> Self {
        Self {
            positions: Vec::new(),
            total_value: 0.0,
        }
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn total_value(&self) -> f64 {
        self.total_value
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Case-insensitive symbol lookup
    pub fn position_by_symbol(&self, symbol: &str) -> Option<&Position> {
        self.positions
            .iter()
            .find(|p| p.symbol().eq_ignore_ascii_case(symbol))
    }

    /// Share of total value held in `symbol`, as a fraction in [0, 1]
    pub fn weight_of(&self, symbol: &str) -> Option<f64> {
        if self.total_value <= 0.0 {
            return None;
        }
        self.position_by_symbol(symbol)
            .map(|p| p.market_value() / self.total_value)
    }

    /// Largest `n` positions by market value
    pub fn top_positions(&self, n: usize) -> Vec<&Position> {
        let mut sorted: Vec<&Position> = self.positions.iter().collect();
        sorted.sort_by(|a, b| b.market_value().total_cmp(&a.market_value()));
        sorted.truncate(n);
        sorted
    }

    /// Total value held in one asset class
    pub fn class_value(&self, class: AssetClass) -> f64 {
        self.positions
            .iter()
            .filter(|p| p.asset_class() == class)
            .map(Position::market_value)
            .sum()
    }

    /// Percentage of the portfolio held in one asset class
    pub fn class_percentage(&self, class: AssetClass) -> f64 {
        if self.total_value <= 0.0 {
            return 0.0;
        }
        self.class_value(class) / self.total_value * 100.0
    }

    /// Sum of unrealized P&L across positions that carry a cost basis
    pub fn total_unrealized_pnl(&self) -> Option<f64> {
        let with_cost: Vec<f64> = self
            .positions
            .iter()
            .filter_map(Position::unrealized_pnl)
            .collect();
        if with_cost.is_empty() {
            None
        } else {
            Some(with_cost.iter().sum())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Portfolio {
        Portfolio::new(vec![
            Position::equity("AAPL", 10.0, 150.0).unwrap(),
            Position::equity("GOOGL", 5.0, 2800.0).unwrap(),
            Position::equity("MSFT", 8.0, 300.0).unwrap(),
            Position::crypto("BTC", 0.5, 50_000.0).unwrap(),
            Position::crypto("ETH", 2.0, 3000.0).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_total_value_is_sum() {
        let portfolio = sample();
        assert_eq!(portfolio.len(), 5);
        assert_eq!(portfolio.total_value(), 1500.0 + 14_000.0 + 2400.0 + 25_000.0 + 6000.0);
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let result = Portfolio::new(vec![
            Position::equity("AAPL", 1.0, 1.0).unwrap(),
            Position::equity("aapl", 2.0, 1.0).unwrap(),
        ]);
        assert_eq!(result, Err(PortfolioError::DuplicateSymbol("AAPL".to_string())));
    }

    #[test]
    fn test_weights_and_lookup() {
        let portfolio = sample();
        let weight = portfolio.weight_of("btc").unwrap();
        assert!((weight - 25_000.0 / 48_900.0).abs() < 1e-12);
        assert!(portfolio.weight_of("DOGE").is_none());
        assert!(Portfolio::empty().weight_of("BTC").is_none());
    }

    #[test]
    fn test_top_positions_and_classes() {
        let portfolio = sample();
        let top: Vec<&str> = portfolio.top_positions(2).iter().map(|p| p.symbol()).collect();
        assert_eq!(top, vec!["BTC", "GOOGL"]);
        assert_eq!(portfolio.class_value(AssetClass::Crypto), 31_000.0);
        assert!((portfolio.class_percentage(AssetClass::Equity) - 17_900.0 / 48_900.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_unrealized_pnl() {
        let portfolio = Portfolio::new(vec![
            Position::equity("AAPL", 10.0, 150.0).unwrap().with_cost_basis(100.0),
            Position::equity("MSFT", 1.0, 300.0).unwrap(),
        ])
        .unwrap();
        assert_eq!(portfolio.total_unrealized_pnl(), Some(500.0));
        assert_eq!(sample().total_unrealized_pnl(), None);
    }
}
