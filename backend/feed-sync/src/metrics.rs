//! Sync metrics for observability

use prometheus::{CounterVec, IntCounter, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<SyncMetricsInner> = OnceLock::new();

struct SyncMetricsInner {
    events: CounterVec,
    evictions: IntCounter,
    snapshot_loads: CounterVec,
    seed_skips: IntCounter,
    terminations: CounterVec,
}

impl SyncMetricsInner {
    fn new() -> Self {
        Self {
            events: CounterVec::new(
                Opts::new(
                    "feed_sync_change_events_total",
                    "Change events applied to the feed cache",
                ),
                &["kind", "outcome"],
            )
            .expect("valid metric definition"),
            evictions: IntCounter::new(
                "feed_sync_evictions_total",
                "Entries evicted by the local cache cap",
            )
            .expect("valid metric definition"),
            snapshot_loads: CounterVec::new(
                Opts::new("feed_sync_snapshot_loads_total", "Bulk snapshot loads"),
                &["result"],
            )
            .expect("valid metric definition"),
            seed_skips: IntCounter::new(
                "feed_sync_seed_skipped_total",
                "Snapshot entries skipped because live events already covered them",
            )
            .expect("valid metric definition"),
            terminations: CounterVec::new(
                Opts::new(
                    "feed_sync_subscription_terminations_total",
                    "Change subscriptions ended",
                ),
                &["reason"],
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.events.clone()))?;
        registry.register(Box::new(self.evictions.clone()))?;
        registry.register(Box::new(self.snapshot_loads.clone()))?;
        registry.register(Box::new(self.seed_skips.clone()))?;
        registry.register(Box::new(self.terminations.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static SyncMetricsInner {
    METRICS.get_or_init(SyncMetricsInner::new)
}

/// Sync metrics wrapper
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncMetrics;

impl SyncMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_event(&self, kind: &str, outcome: &str) {
        get_metrics()
            .events
            .with_label_values(&[kind, outcome])
            .inc();
    }

    pub fn record_evictions(&self, count: usize) {
        if count > 0 {
            get_metrics().evictions.inc_by(count as u64);
        }
    }

    pub fn record_snapshot_load(&self, result: &str) {
        get_metrics()
            .snapshot_loads
            .with_label_values(&[result])
            .inc();
    }

    pub fn record_seed_skips(&self, count: usize) {
        if count > 0 {
            get_metrics().seed_skips.inc_by(count as u64);
        }
    }

    pub fn record_termination(&self, reason: &str) {
        get_metrics()
            .terminations
            .with_label_values(&[reason])
            .inc();
    }
}
