//! Portfolio positions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PortfolioError, Result};

/// Asset class of a holding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Equity,
    Crypto,
}

impl AssetClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equity => "equity",
            Self::Crypto => "crypto",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single holding at snapshot time
///
/// `market_value` is always `quantity * current_price`; fields are private so
/// the invariant cannot drift after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    symbol: String,
    asset_class: AssetClass,
    quantity: f64,
    current_price: f64,
    market_value: f64,
    average_cost: Option<f64>,
    unrealized_pnl: Option<f64>,
    name: Option<String>,
    as_of: DateTime<Utc>,
}

impl Position {
    /// Create a position, validating quantity and price
    pub fn new(
        symbol: impl Into<String>,
        asset_class: AssetClass,
        quantity: f64,
        current_price: f64,
    ) -> Result<Self> {
        let symbol = symbol.into().trim().to_uppercase();
        if symbol.is_empty() {
            return Err(PortfolioError::EmptySymbol);
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(PortfolioError::InvalidQuantity { symbol, quantity });
        }
        if !current_price.is_finite() || current_price <= 0.0 {
            return Err(PortfolioError::InvalidPrice {
                symbol,
                price: current_price,
            });
        }

        Ok(Self {
            market_value: quantity * current_price,
            symbol,
            asset_class,
            quantity,
            current_price,
            average_cost: None,
            unrealized_pnl: None,
            name: None,
            as_of: Utc::now(),
        })
    }

    /// Shorthand for an equity position
    pub fn equity(symbol: impl Into<String>, quantity: f64, current_price: f64) -> Result<Self> {
        Self::new(symbol, AssetClass::Equity, quantity, current_price)
    }

    /// Shorthand for a crypto position
    pub fn crypto(symbol: impl Into<String>, quantity: f64, current_price: f64) -> Result<Self> {
        Self::new(symbol, AssetClass::Crypto, quantity, current_price)
    }

    /// Attach a per-unit cost basis; unrealized P&L is derived from it
    pub fn with_cost_basis(mut self, average_cost: f64) -> Self {
        if average_cost.is_finite() && average_cost > 0.0 {
            self.average_cost = Some(average_cost);
            self.unrealized_pnl = Some((self.current_price - average_cost) * self.quantity);
        }
        self
    }

    /// Attach a display name (company or coin name)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn asset_class(&self) -> AssetClass {
        self.asset_class
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn current_price(&self) -> f64 {
        self.current_price
    }

    pub fn market_value(&self) -> f64 {
        self.market_value
    }

    pub fn average_cost(&self) -> Option<f64> {
        self.average_cost
    }

    pub fn unrealized_pnl(&self) -> Option<f64> {
        self.unrealized_pnl
    }

    /// Unrealized P&L as a percentage of cost
    pub fn unrealized_pnl_percent(&self) -> Option<f64> {
        let cost = self.average_cost? * self.quantity;
        self.unrealized_pnl.map(|pnl| pnl / cost * 100.0)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }
}
