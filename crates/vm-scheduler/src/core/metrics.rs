//! Event bus & metrics (§4.I): aggregate counters broadcast on every state
//! change the service observes.

use tokio::sync::broadcast;

/// Cumulative lifetime counters (§3, §9). `queued_vms` and `running_vms` are
/// gauges; `submitted_vms`, `finished_vms` and `unscheduled_vms` only ever
/// grow, even across explicit server deletion.
#[derive(Default, Clone, Copy)]
pub struct Counters {
    pub submitted_vms: u64,
    pub queued_vms: u64,
    pub running_vms: u64,
    pub finished_vms: u64,
    pub unscheduled_vms: u64,
}

/// A point-in-time snapshot broadcast to every subscriber of `service.events`
/// (§6). Mirrors `Counters` plus the fleet's current host totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsAvailable {
    pub host_count: usize,
    pub available_host_count: usize,
    pub submitted_vms: u64,
    pub running_vms: u64,
    pub finished_vms: u64,
    pub queued_vms: u64,
    pub unscheduled_vms: u64,
}

/// Multi-subscriber, hot broadcast of metrics snapshots (§6, §9). A producer
/// with no subscribers simply drops the value — the core is a producer only.
pub struct MetricsBus {
    tx: broadcast::Sender<MetricsAvailable>,
}

impl MetricsBus {
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _rx) = broadcast::channel(buffer_size);
        Self { tx }
    }

    pub fn publish(&self, snapshot: MetricsAvailable) {
        let _ = self.tx.send(snapshot);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricsAvailable> {
        self.tx.subscribe()
    }
}

impl Default for MetricsBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
