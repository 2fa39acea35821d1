//! Builders for the four per-asset sub-analyses
//!
//! Each builder is a pure function of already-fetched data; fetching and
//! retrying is the asset task's job.

pub mod event;
pub mod risk;
pub mod sentiment;
pub mod technical;

pub use event::analyze_events;
pub use risk::{RiskInputs, assess_risk};
pub use sentiment::analyze_sentiment;
pub use technical::analyze_technical;

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
