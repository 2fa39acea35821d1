//! Event sub-analysis: upcoming catalysts and their expected impact

use crate::indicators::round_to;
use crate::models::{EventAnalysis, Impact};
use crate::providers::{EventKind, MarketEvent};

const BASE_CONFIDENCE: f64 = 0.5;
const CONFIDENCE_PER_EVENT: f64 = 0.05;
const MAX_CONFIDENCE: f64 = 0.8;

/// Summarize the first `max_events` events
pub fn analyze_events(events: &[MarketEvent], max_events: usize) -> EventAnalysis {
    let upcoming: Vec<MarketEvent> = events.iter().take(max_events).cloned().collect();

    let next_date = |kind: EventKind| {
        upcoming
            .iter()
            .filter(|e| e.kind == kind)
            .find_map(|e| e.date)
    };

    let positive_catalysts: Vec<String> = upcoming
        .iter()
        .filter(|e| e.impact == Impact::Positive)
        .map(|e| e.description.clone())
        .collect();
    let negative_catalysts: Vec<String> = upcoming
        .iter()
        .filter(|e| e.impact == Impact::Negative)
        .map(|e| e.description.clone())
        .collect();

    let overall_impact = match positive_catalysts.len().cmp(&negative_catalysts.len()) {
        std::cmp::Ordering::Greater => Impact::Positive,
        std::cmp::Ordering::Less => Impact::Negative,
        std::cmp::Ordering::Equal => Impact::Neutral,
    };

    let confidence =
        (BASE_CONFIDENCE + CONFIDENCE_PER_EVENT * upcoming.len() as f64).min(MAX_CONFIDENCE);

    EventAnalysis {
        earnings_date: next_date(EventKind::Earnings),
        dividend_date: next_date(EventKind::Dividend),
        upcoming_events: upcoming,
        positive_catalysts,
        negative_catalysts,
        overall_impact,
        confidence: round_to(confidence, 4),
    }
}
