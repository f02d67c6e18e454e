//! Counters for the dispatch loop

use std::sync::atomic::{AtomicU64, Ordering};

use crate::registry::BroadcastReport;

/// Point-in-time view of a hub
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Currently registered subscribers
    pub subscribers: usize,
    /// Text frames read from upstream
    pub frames_received: u64,
    /// Events placed in a subscriber's buffer
    pub events_delivered: u64,
    /// Events skipped because a subscriber's buffer was full
    pub events_dropped: u64,
    /// Whether shutdown has been requested
    pub shutdown_requested: bool,
}

/// Running totals updated by the dispatch loop
#[derive(Debug, Default)]
pub struct HubCounters {
    frames_received: AtomicU64,
    events_delivered: AtomicU64,
    events_dropped: AtomicU64,
}

impl HubCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one broadcast frame and its per-subscriber outcome
    pub fn record(&self, report: &BroadcastReport) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.events_delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.events_dropped
            .fetch_add(report.dropped as u64, Ordering::Relaxed);
    }

    /// Fill a stats snapshot with the current totals
    pub fn snapshot(&self, subscribers: usize, shutdown_requested: bool) -> HubStats {
        HubStats {
            subscribers,
            frames_received: self.frames_received.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            shutdown_requested,
        }
    }
}
