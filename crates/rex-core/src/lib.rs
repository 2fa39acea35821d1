//! Core portfolio types for quantrex
//!
//! This crate holds the immutable snapshot of a portfolio that the analysis
//! engine consumes:
//!
//! - [`Position`]: one holding, with market value derived at construction
//! - [`Portfolio`]: an ordered set of positions with a cached total value
//! - [`PortfolioError`]: validation failures raised while building either
//!
//! Acquiring the data (brokerage APIs, files) happens elsewhere; this crate
//! only guarantees the invariants the engine relies on.

pub mod error;
pub mod portfolio;
pub mod position;

pub use error::{PortfolioError, Result};
pub use portfolio::Portfolio;
pub use position::{AssetClass, Position};
