//! Statistics for cache monitoring

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters and gauges describing cache activity
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Dispatches answered from a fulfilled entry
    pub hits: u64,

    /// Dispatches that started a fetch
    pub misses: u64,

    /// Dispatches attached to a fetch already in flight
    pub deduplicated: u64,

    /// Fetcher invocations for queries (retries not counted)
    pub fetches: u64,

    /// Entries marked stale by tag invalidation
    pub invalidations: u64,

    /// Fetches started because of an invalidation
    pub refetches: u64,

    /// Entries removed by garbage collection
    pub evictions_gc: u64,

    /// Mutations that completed successfully
    pub mutations: u64,

    /// Mutations that failed
    pub mutation_failures: u64,

    /// Entries currently cached
    pub entries: usize,

    /// Live subscription handles
    pub subscriptions: usize,

    /// Fetches currently in flight
    pub in_flight: usize,
}

impl CacheStats {
    /// Share of dispatches served without a new fetch, as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.deduplicated;
        if total == 0 {
            0.0
        } else {
            ((self.hits + self.deduplicated) as f64 / total as f64) * 100.0
        }
    }

    /// Share of would-be fetches collapsed into an in-flight one, as a percentage
    pub fn dedup_rate(&self) -> f64 {
        let total = self.misses + self.deduplicated;
        if total == 0 {
            0.0
        } else {
            (self.deduplicated as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, deduplicated: {}, hit_rate: {:.2}%, entries: {}, subscriptions: {}, invalidations: {}, evictions: {} }}",
            self.hits,
            self.misses,
            self.deduplicated,
            self.hit_rate(),
            self.entries,
            self.subscriptions,
            self.invalidations,
            self.evictions_gc
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 60,
            misses: 20,
            deduplicated: 20,
            ..Default::default()
        };

        assert_eq!(stats.hit_rate(), 80.0);
        assert_eq!(stats.dedup_rate(), 50.0);
    }

    #[test]
    fn test_zero_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.dedup_rate(), 0.0);
    }

    #[test]
    fn test_display() {
        let stats = CacheStats {
            hits: 100,
            misses: 50,
            entries: 7,
            ..Default::default()
        };

        let display = format!("{}", stats);
        assert!(display.contains("hits: 100"));
        assert!(display.contains("entries: 7"));
    }
}
