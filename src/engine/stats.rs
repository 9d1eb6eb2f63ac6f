// Live counters for the relay: cache effectiveness, queue throughput, transfers.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

struct StatsSample {
    at: Instant,
    transferred_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub messages_enqueued: u64,
    pub messages_delivered: u64,
    pub messages_failed: u64,
    pub queue_depth: u64,
    pub transfer_attempts: u64,
    pub transfer_failures: u64,
    pub transferred_bytes: u64,
    pub transfer_bps: u64,
    pub active_transfers: u32,
}

pub struct RelayStats {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    messages_enqueued: AtomicU64,
    messages_delivered: AtomicU64,
    messages_failed: AtomicU64,
    transfer_attempts: AtomicU64,
    transfer_failures: AtomicU64,
    transferred_bytes: AtomicU64,
    active_transfers: AtomicU32,
    last_sample: Mutex<StatsSample>,
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            messages_enqueued: AtomicU64::new(0),
            messages_delivered: AtomicU64::new(0),
            messages_failed: AtomicU64::new(0),
            transfer_attempts: AtomicU64::new(0),
            transfer_failures: AtomicU64::new(0),
            transferred_bytes: AtomicU64::new(0),
            active_transfers: AtomicU32::new(0),
            last_sample: Mutex::new(StatsSample {
                at: Instant::now(),
                transferred_bytes: 0,
            }),
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enqueued(&self) {
        self.messages_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// One message left the queue; `ok` is the channel's verdict.
    pub fn record_dispatched(&self, ok: bool) {
        if ok {
            self.messages_delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.messages_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_attempt(&self) {
        self.transfer_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_attempt_failed(&self) {
        self.transfer_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transferred(&self, bytes: u64) {
        self.transferred_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_transfers(&self) {
        self.active_transfers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_transfers(&self) {
        self.active_transfers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) -> u64 {
        self.messages_delivered.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let now = Instant::now();
        let transferred = self.transferred_bytes.load(Ordering::Relaxed);

        let transfer_bps = {
            let mut sample = self.last_sample.lock();
            let elapsed = now.duration_since(sample.at).as_secs_f64();
            let bps = if elapsed > 0.1 {
                ((transferred - sample.transferred_bytes) as f64 / elapsed) as u64
            } else {
                0
            };
            sample.at = now;
            sample.transferred_bytes = transferred;
            bps
        };

        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let cache_hit_rate = if hits + misses > 0 {
            hits as f64 / (hits + misses) as f64
        } else {
            0.0
        };

        let enqueued = self.messages_enqueued.load(Ordering::Relaxed);
        let delivered = self.messages_delivered.load(Ordering::Relaxed);
        let failed = self.messages_failed.load(Ordering::Relaxed);

        StatsSnapshot {
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate,
            messages_enqueued: enqueued,
            messages_delivered: delivered,
            messages_failed: failed,
            queue_depth: enqueued.saturating_sub(delivered + failed),
            transfer_attempts: self.transfer_attempts.load(Ordering::Relaxed),
            transfer_failures: self.transfer_failures.load(Ordering::Relaxed),
            transferred_bytes: transferred,
            transfer_bps,
            active_transfers: self.active_transfers.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}
