//! Injectable time sources
//!
//! Every scheduling pause (stagger, rate limit, batch gap, retry backoff) goes
//! through a [`Sleeper`], and the cache day comes from a [`Clock`], so tests
//! can run a whole portfolio without waiting and pin the calendar day.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Suspends the current task
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Supplies the calendar day used for cache keys
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Sleeper backed by `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Clock reading the current UTC date
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock that can be moved by hand
#[derive(Debug)]
pub struct ManualClock {
    day: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day: Mutex::new(day),
        }
    }

    /// Move to another day
    pub fn set(&self, day: NaiveDate) {
        *self.day.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = day;
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.day.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Sleeper that records requested pauses and returns immediately
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All requested pauses, in request order
    pub fn calls(&self) -> Vec<Duration> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Sum of all requested pauses
    pub fn total(&self) -> Duration {
        self.calls().iter().sum()
    }

    /// How many times `duration` was requested
    pub fn count_of(&self, duration: Duration) -> usize {
        self.calls().iter().filter(|d| **d == duration).count()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(duration);
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_sleeper() {
        let sleeper = RecordingSleeper::new();
        sleeper.sleep(Duration::from_millis(5)).await;
        sleeper.sleep(Duration::from_millis(5)).await;
        sleeper.sleep(Duration::from_secs(1)).await;

        assert_eq!(sleeper.calls().len(), 3);
        assert_eq!(sleeper.count_of(Duration::from_millis(5)), 2);
        assert_eq!(sleeper.total(), Duration::from_millis(1010));
    }

    #[test]
    fn test_manual_clock() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let clock = ManualClock::new(day);
        assert_eq!(clock.today(), day);

        let next = day.succ_opt().unwrap();
        clock.set(next);
        assert_eq!(clock.today(), next);
    }

    #[tokio::test]
    async fn test_tokio_sleeper_zero_returns() {
        TokioSleeper.sleep(Duration::ZERO).await;
    }
}
