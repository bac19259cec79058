//! Lock-free metrics collection and periodic reporting
//!
//! Counters are plain atomics so the sighting path never contends on a
//! mutex for bookkeeping. `report()` swaps the per-interval counters.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only; do NOT use them for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Lock-free metrics collector
pub struct Metrics {
    /// Sightings dispatched to the registry (monotonic)
    sightings_total: AtomicU64,
    /// Sightings since last report (reset on report)
    sightings_since_report: AtomicU64,
    /// Unknown/outside -> inside transitions (monotonic)
    inside_transitions: AtomicU64,
    /// Unknown/inside -> outside transitions (monotonic)
    outside_transitions: AtomicU64,
    /// Expiry sweeps run (monotonic)
    sweeps_total: AtomicU64,
    /// Successful state saves (monotonic)
    saves_total: AtomicU64,
    /// Failed state saves (monotonic)
    save_failures: AtomicU64,
    /// Notifications dropped because the consumer was gone (monotonic)
    notifications_dropped: AtomicU64,
    /// Malformed sighting lines skipped (monotonic)
    sightings_rejected: AtomicU64,
    /// Currently monitored regions (gauge)
    monitored_regions: AtomicU64,
    /// Start of the current reporting interval
    last_report: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sightings_total: AtomicU64::new(0),
            sightings_since_report: AtomicU64::new(0),
            inside_transitions: AtomicU64::new(0),
            outside_transitions: AtomicU64::new(0),
            sweeps_total: AtomicU64::new(0),
            saves_total: AtomicU64::new(0),
            save_failures: AtomicU64::new(0),
            notifications_dropped: AtomicU64::new(0),
            sightings_rejected: AtomicU64::new(0),
            monitored_regions: AtomicU64::new(0),
            last_report: parking_lot::Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_sighting(&self) {
        self.sightings_total.fetch_add(1, Ordering::Relaxed);
        self.sightings_since_report.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_transition(&self, inside: bool) {
        if inside {
            self.inside_transitions.fetch_add(1, Ordering::Relaxed);
        } else {
            self.outside_transitions.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_sweep(&self) {
        self.sweeps_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_save(&self, ok: bool) {
        if ok {
            self.saves_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.save_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_notification_dropped(&self) {
        self.notifications_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sighting_rejected(&self) {
        self.sightings_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn set_monitored_regions(&self, count: usize) {
        self.monitored_regions.store(count as u64, Ordering::Relaxed);
    }

    /// Snapshot counters and reset the per-interval ones
    pub fn report(&self) -> MetricsSummary {
        let elapsed_secs = {
            let mut last = self.last_report.lock();
            let elapsed = last.elapsed().as_secs_f64();
            *last = Instant::now();
            elapsed
        };
        let interval_sightings = self.sightings_since_report.swap(0, Ordering::Relaxed);
        let sightings_per_sec =
            if elapsed_secs > 0.0 { interval_sightings as f64 / elapsed_secs } else { 0.0 };

        MetricsSummary {
            sightings_total: self.sightings_total.load(Ordering::Relaxed),
            sightings_per_sec,
            inside_transitions: self.inside_transitions.load(Ordering::Relaxed),
            outside_transitions: self.outside_transitions.load(Ordering::Relaxed),
            sweeps_total: self.sweeps_total.load(Ordering::Relaxed),
            saves_total: self.saves_total.load(Ordering::Relaxed),
            save_failures: self.save_failures.load(Ordering::Relaxed),
            notifications_dropped: self.notifications_dropped.load(Ordering::Relaxed),
            sightings_rejected: self.sightings_rejected.load(Ordering::Relaxed),
            monitored_regions: self.monitored_regions.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time metrics for logging
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub sightings_total: u64,
    pub sightings_per_sec: f64,
    pub inside_transitions: u64,
    pub outside_transitions: u64,
    pub sweeps_total: u64,
    pub saves_total: u64,
    pub save_failures: u64,
    pub notifications_dropped: u64,
    pub sightings_rejected: u64,
    pub monitored_regions: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            sightings_total = %self.sightings_total,
            sightings_per_sec = %format!("{:.1}", self.sightings_per_sec),
            inside_transitions = %self.inside_transitions,
            outside_transitions = %self.outside_transitions,
            sweeps = %self.sweeps_total,
            saves = %self.saves_total,
            save_failures = %self.save_failures,
            dropped = %self.notifications_dropped,
            rejected = %self.sightings_rejected,
            regions = %self.monitored_regions,
            "metrics"
        );
    }
}
