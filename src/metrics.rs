//! Lightweight performance counters.
//!
//! Mirrors the teacher's `CacheStats` (hits/misses/evictions), but tracks
//! the coherence-protocol-specific events instead: cache hits/misses, lock
//! contentions, and CAS outcomes. Serves as the diagnostic visibility the
//! spec's Open Question invites ("An implementer may choose to emit a
//! diagnostic counter") without ever surfacing an error for partial CAS
//! failure.

use std::sync::atomic::{AtomicU64, Ordering};

/// Always-on counters, updated lock-free from concurrent protocol calls.
#[derive(Debug, Default)]
pub struct Metrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    lock_contentions: AtomicU64,
    write_locks: AtomicU64,
    cas_successes: AtomicU64,
    cas_failures: AtomicU64,
}

/// A point-in-time snapshot of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub lock_contentions: u64,
    pub write_locks: u64,
    pub cas_successes: u64,
    pub cas_failures: u64,
}

impl Metrics {
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss_all(&self, n: usize) {
        self.cache_misses.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_lock_contention(&self) {
        self.lock_contentions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_lock(&self) {
        self.write_locks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cas_success(&self) {
        self.cas_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cas_failure(&self) {
        self.cas_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Stats {
        Stats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            lock_contentions: self.lock_contentions.load(Ordering::Relaxed),
            write_locks: self.write_locks.load(Ordering::Relaxed),
            cas_successes: self.cas_successes.load(Ordering::Relaxed),
            cas_failures: self.cas_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_recorded_events() {
        let metrics = Metrics::default();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        metrics.record_cas_failure();

        let stats = metrics.snapshot();
        assert_eq!(stats.cache_hits, 2);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cas_failures, 1);
        assert_eq!(stats.cas_successes, 0);
    }
}
