use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::pool::PoolStats;

/// Counters shared by every stage of a pipeline.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    received: AtomicU64,
    ignored: AtomicU64,
    replaced: AtomicU64,
    decoded: AtomicU64,
    decode_failures: AtomicU64,
    presented: AtomicU64,
    present_failures: AtomicU64,
    resources_created: AtomicU64,
    swaps: AtomicU64,
    last_presented_seq: AtomicU64,
}

impl PipelineCounters {
    pub fn on_received(&self, replaced: bool) {
        self.received.fetch_add(1, Ordering::Relaxed);
        if replaced {
            self.replaced.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn on_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_presented(&self, seq: u64, resource_created: bool) {
        self.presented.fetch_add(1, Ordering::Relaxed);
        self.last_presented_seq.store(seq, Ordering::Relaxed);
        if resource_created {
            self.resources_created.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn on_present_failure(&self) {
        self.present_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_swap(&self) {
        self.swaps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, encoded_pool: PoolStats, pixel_pool: PoolStats) -> PipelineStats {
        PipelineStats {
            received: self.received.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            presented: self.presented.load(Ordering::Relaxed),
            present_failures: self.present_failures.load(Ordering::Relaxed),
            resources_created: self.resources_created.load(Ordering::Relaxed),
            swaps: self.swaps.load(Ordering::Relaxed),
            last_presented_seq: self.last_presented_seq.load(Ordering::Relaxed),
            encoded_pool,
            pixel_pool,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub received: u64,
    /// Empty payloads and payloads that arrived after shutdown.
    pub ignored: u64,
    /// Frames overwritten in the slot before they were decoded.
    pub replaced: u64,
    pub decoded: u64,
    pub decode_failures: u64,
    pub presented: u64,
    pub present_failures: u64,
    pub resources_created: u64,
    pub swaps: u64,
    pub last_presented_seq: u64,
    pub encoded_pool: PoolStats,
    pub pixel_pool: PoolStats,
}
