//! Error types for portfolio construction

use thiserror::Error;

/// Result type alias for rex-core
pub type Result<T> = std::result::Result<T, PortfolioError>;

/// Validation errors raised while building positions and portfolios
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
    /// Symbol was empty or whitespace
    #[error("Position symbol must not be empty")]
    EmptySymbol,

    /// Quantity must be strictly positive and finite
    #[error("Invalid quantity for {symbol}: {quantity}")]
    InvalidQuantity { symbol: String, quantity: f64 },

    /// Price must be strictly positive and finite
    #[error("Invalid price for {symbol}: {price}")]
    InvalidPrice { symbol: String, price: f64 },

    /// Symbols are unique within a snapshot
    #[error("Duplicate symbol in portfolio: {0}")]
    DuplicateSymbol(String),
}
