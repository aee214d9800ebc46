use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Which path answered a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedPath {
    Indexed,
    Fallback,
}

impl ServedPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServedPath::Indexed => "indexed",
            ServedPath::Fallback => "fallback",
        }
    }
}

/// Per-service counters telling operators how searches were served.
///
/// Callers of the search API never see which path answered; these counters
/// (and the `termsearch_served_total` metric) are the only place it shows.
#[derive(Debug, Default)]
pub struct RetrievalStats {
    served_indexed: AtomicU64,
    served_fallback: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time copy of [`RetrievalStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub served_indexed: u64,
    pub served_fallback: u64,
    pub failures: u64,
}

impl RetrievalStats {
    pub fn record_served(&self, path: ServedPath) {
        let counter = match path {
            ServedPath::Indexed => &self.served_indexed,
            ServedPath::Fallback => &self.served_fallback,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            served_indexed: self.served_indexed.load(Ordering::Relaxed),
            served_fallback: self.served_fallback.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = RetrievalStats::default();
        stats.record_served(ServedPath::Indexed);
        stats.record_served(ServedPath::Fallback);
        stats.record_served(ServedPath::Fallback);
        stats.record_failure();

        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                served_indexed: 1,
                served_fallback: 2,
                failures: 1,
            }
        );
    }
}
