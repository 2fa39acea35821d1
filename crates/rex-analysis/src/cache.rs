//! Day-keyed cache of finished asset analyses
//!
//! An entry lives for one calendar day: a symbol is analyzed at most once per
//! day, and a new day simply misses. Entries from earlier days are never
//! evicted here; rotation is the owner's call via [`AnalysisCache::clear`].

use cached::{Cached, UnboundCache};
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::AssetAnalysis;

/// Cache key: upper-cased symbol plus calendar day
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnalysisKey {
    pub symbol: String,
    pub day: NaiveDate,
}

impl AnalysisKey {
    pub fn new(symbol: &str, day: NaiveDate) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            day,
        }
    }
}

/// Thread-safe analysis cache shared by every task in a run
#[derive(Clone)]
pub struct AnalysisCache {
    cache: Arc<RwLock<UnboundCache<AnalysisKey, AssetAnalysis>>>,
}

impl std::fmt::Debug for AnalysisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisCache").finish_non_exhaustive()
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(RwLock::new(UnboundCache::new())),
        }
    }

    /// Get a value from the cache
    pub async fn get(&self, key: &AnalysisKey) -> Option<AssetAnalysis> {
        // cache_get records hit statistics, so it needs the write half
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    /// Insert a value, replacing any analysis stored for the same key
    pub async fn insert(&self, key: AnalysisKey, analysis: AssetAnalysis) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, analysis);
    }

    pub async fn invalidate(&self, key: &AnalysisKey) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_remove(key);
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rex_core::Position;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn analysis(symbol: &str) -> AssetAnalysis {
        AssetAnalysis::fallback(&Position::equity(symbol, 1.0, 10.0).unwrap())
    }

    #[test]
    fn test_key_normalizes_symbol() {
        assert_eq!(AnalysisKey::new(" aapl ", day(1)), AnalysisKey::new("AAPL", day(1)));
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = AnalysisCache::new();
        let key = AnalysisKey::new("AAPL", day(1));
        let value = analysis("AAPL");

        cache.insert(key.clone(), value.clone()).await;
        assert_eq!(cache.get(&key).await, Some(value));
    }

    #[tokio::test]
    async fn test_entries_are_per_day() {
        let cache = AnalysisCache::new();
        cache.insert(AnalysisKey::new("AAPL", day(1)), analysis("AAPL")).await;

        assert!(cache.get(&AnalysisKey::new("aapl", day(1))).await.is_some());
        assert!(cache.get(&AnalysisKey::new("AAPL", day(2))).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = AnalysisCache::new();
        for symbol in ["AAPL", "MSFT", "BTC"] {
            cache.insert(AnalysisKey::new(symbol, day(1)), analysis(symbol)).await;
        }
        assert_eq!(cache.len().await, 3);

        cache.invalidate(&AnalysisKey::new("MSFT", day(1))).await;
        assert_eq!(cache.len().await, 2);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache = AnalysisCache::new();
        let other = cache.clone();
        other.insert(AnalysisKey::new("ETH", day(3)), analysis("ETH")).await;
        assert_eq!(cache.len().await, 1);
    }
}
