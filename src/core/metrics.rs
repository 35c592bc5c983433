use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Daemon-wide counters, cheap enough to bump from every ingestion loop.
#[derive(Debug)]
pub struct DaemonMetrics {
    events_received: AtomicU64,
    events_rejected: AtomicU64,
    signals_stale: AtomicU64,
    signals_superseded: AtomicU64,
    votes_recorded: AtomicU64,
    actions_executed: AtomicU64,
    execution_failures: AtomicU64,
    start_time: Instant,
}

impl DaemonMetrics {
    pub fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            events_rejected: AtomicU64::new(0),
            signals_stale: AtomicU64::new(0),
            signals_superseded: AtomicU64::new(0),
            votes_recorded: AtomicU64::new(0),
            actions_executed: AtomicU64::new(0),
            execution_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_events_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_events_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_signals_stale(&self) {
        self.signals_stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_signals_superseded(&self) {
        self.signals_superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_votes_recorded(&self) {
        self.votes_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_actions_executed(&self) {
        self.actions_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_execution_failures(&self) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }

    pub fn events_rejected(&self) -> u64 {
        self.events_rejected.load(Ordering::Relaxed)
    }

    pub fn signals_stale(&self) -> u64 {
        self.signals_stale.load(Ordering::Relaxed)
    }

    pub fn votes_recorded(&self) -> u64 {
        self.votes_recorded.load(Ordering::Relaxed)
    }

    pub fn actions_executed(&self) -> u64 {
        self.actions_executed.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> HashMap<String, serde_json::Value> {
        let mut snapshot = HashMap::new();
        snapshot.insert(
            "events_received".to_string(),
            serde_json::json!(self.events_received()),
        );
        snapshot.insert(
            "events_rejected".to_string(),
            serde_json::json!(self.events_rejected()),
        );
        snapshot.insert(
            "signals_stale".to_string(),
            serde_json::json!(self.signals_stale()),
        );
        snapshot.insert(
            "signals_superseded".to_string(),
            serde_json::json!(self.signals_superseded.load(Ordering::Relaxed)),
        );
        snapshot.insert(
            "votes_recorded".to_string(),
            serde_json::json!(self.votes_recorded()),
        );
        snapshot.insert(
            "actions_executed".to_string(),
            serde_json::json!(self.actions_executed()),
        );
        snapshot.insert(
            "execution_failures".to_string(),
            serde_json::json!(self.execution_failures.load(Ordering::Relaxed)),
        );
        snapshot.insert(
            "uptime_secs".to_string(),
            serde_json::json!(self.uptime_secs()),
        );
        snapshot
    }
}

impl Default for DaemonMetrics {
    fn default() -> Self {
        Self::new()
    }
}
