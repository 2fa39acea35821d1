//! Shared utilities for quantrex
//!
//! This crate provides the ambient pieces used across the workspace:
//! tracing setup and environment-backed runtime settings.

pub mod config;
pub mod logging;

pub use config::Settings;
pub use logging::{init_tracing, init_tracing_with};
