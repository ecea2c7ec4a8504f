//! Metrics registry
//!
//! Counters only, monotonic, reset when the owning disk is dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one disk
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    headers_allocated: AtomicU64,
    blocks_allocated: AtomicU64,
    spans_scrubbed: AtomicU64,
    allocation_failures: AtomicU64,
    bytes_written: AtomicU64,
    bytes_appended: AtomicU64,
    bytes_read: AtomicU64,
    entries_removed: AtomicU64,
    blocks_released: AtomicU64,
}

impl MetricsRegistry {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_headers(&self) {
        self.headers_allocated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_blocks(&self) {
        self.blocks_allocated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_scrubbed_spans(&self, spans: u64) {
        self.spans_scrubbed.fetch_add(spans, Ordering::Relaxed);
    }

    pub fn increment_allocation_failures(&self) {
        self.allocation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes_written(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_bytes_appended(&self, bytes: u64) {
        self.bytes_appended.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_bytes_read(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_entries_removed(&self) {
        self.entries_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_blocks_released(&self, blocks: u64) {
        self.blocks_released.fetch_add(blocks, Ordering::Relaxed);
    }

    /// Get all counters at once
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            headers_allocated: self.headers_allocated.load(Ordering::Relaxed),
            blocks_allocated: self.blocks_allocated.load(Ordering::Relaxed),
            spans_scrubbed: self.spans_scrubbed.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            bytes_appended: self.bytes_appended.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            entries_removed: self.entries_removed.load(Ordering::Relaxed),
            blocks_released: self.blocks_released.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub headers_allocated: u64,
    pub blocks_allocated: u64,
    pub spans_scrubbed: u64,
    pub allocation_failures: u64,
    pub bytes_written: u64,
    pub bytes_appended: u64,
    pub bytes_read: u64,
    pub entries_removed: u64,
    pub blocks_released: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        assert_eq!(MetricsRegistry::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = MetricsRegistry::new();
        metrics.increment_blocks();
        metrics.increment_blocks();
        metrics.add_bytes_written(77);
        metrics.add_bytes_written(3);
        metrics.add_scrubbed_spans(2);

        let snap = metrics.snapshot();
        assert_eq!(snap.blocks_allocated, 2);
        assert_eq!(snap.bytes_written, 80);
        assert_eq!(snap.spans_scrubbed, 2);
        assert_eq!(snap.headers_allocated, 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = MetricsRegistry::new();
        metrics.increment_headers();

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["headers_allocated"], 1);
        assert_eq!(json["bytes_read"], 0);
    }
}
