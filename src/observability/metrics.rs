//! Thread-safe metrics collection system
//!
//! Provides atomic counters per telemetry kind for ticks, published readings and broker
//! connection churn.

use crate::telemetry::TelemetryKind;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

/// Counters of a single publisher
#[derive(Debug, Default)]
struct KindCounters {
    ticks: AtomicU64,
    readings_published: AtomicU64,
    ticks_skipped: AtomicU64,
    publish_failures: AtomicU64,
    source_errors: AtomicU64,
    connected: AtomicBool,
    connection_attempts: AtomicU64,
    connections_established: AtomicU64,
    connections_lost: AtomicU64,
    last_tick: AtomicU64,
}

impl KindCounters {
    fn reset(&self) {
        for counter in [
            &self.ticks,
            &self.readings_published,
            &self.ticks_skipped,
            &self.publish_failures,
            &self.source_errors,
            &self.connection_attempts,
            &self.connections_established,
            &self.connections_lost,
            &self.last_tick,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.connected.store(false, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PublisherMetrics {
        PublisherMetrics {
            connected: self.connected.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            readings_published: self.readings_published.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
            connection_attempts: self.connection_attempts.load(Ordering::Relaxed),
            connections_established: self.connections_established.load(Ordering::Relaxed),
            connections_lost: self.connections_lost.load(Ordering::Relaxed),
            last_tick: self.last_tick.load(Ordering::Relaxed),
        }
    }
}

/// Thread-safe metrics collector using atomics
#[derive(Debug)]
pub struct MetricsCollector {
    kinds: [KindCounters; 3],
    uptime_start: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            kinds: Default::default(),
            uptime_start: AtomicU64::new(current_timestamp()),
        }
    }

    fn counters(&self, kind: TelemetryKind) -> &KindCounters {
        &self.kinds[kind.index()]
    }

    // Tick metrics
    pub fn tick(&self, kind: TelemetryKind) {
        let counters = self.counters(kind);
        counters.ticks.fetch_add(1, Ordering::Relaxed);
        counters
            .last_tick
            .store(current_timestamp(), Ordering::Relaxed);
    }

    pub fn tick_skipped(&self, kind: TelemetryKind) {
        self.counters(kind)
            .ticks_skipped
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn source_error(&self, kind: TelemetryKind) {
        self.counters(kind)
            .source_errors
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn reading_published(&self, kind: TelemetryKind) {
        self.counters(kind)
            .readings_published
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn publish_failed(&self, kind: TelemetryKind) {
        self.counters(kind)
            .publish_failures
            .fetch_add(1, Ordering::Relaxed);
    }

    // MQTT metrics
    pub fn connection_attempt(&self, kind: TelemetryKind) {
        self.counters(kind)
            .connection_attempts
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_established(&self, kind: TelemetryKind) {
        let counters = self.counters(kind);
        counters
            .connections_established
            .fetch_add(1, Ordering::Relaxed);
        counters.connected.store(true, Ordering::Relaxed);
    }

    pub fn connection_lost(&self, kind: TelemetryKind) {
        let counters = self.counters(kind);
        counters.connections_lost.fetch_add(1, Ordering::Relaxed);
        counters.connected.store(false, Ordering::Relaxed);
    }

    pub fn connection_closed(&self, kind: TelemetryKind) {
        self.counters(kind)
            .connected
            .store(false, Ordering::Relaxed);
    }

    /// Metrics of one publisher
    pub fn publisher(&self, kind: TelemetryKind) -> PublisherMetrics {
        self.counters(kind).snapshot()
    }

    // Reset all metrics (useful for testing)
    pub fn reset(&self) {
        for counters in &self.kinds {
            counters.reset();
        }
        self.uptime_start
            .store(current_timestamp(), Ordering::Relaxed);
    }

    /// Get complete metrics snapshot
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let now = current_timestamp();
        let publishers: BTreeMap<String, PublisherMetrics> = TelemetryKind::ALL
            .iter()
            .map(|kind| (kind.as_str().to_string(), self.publisher(*kind)))
            .collect();

        let readings_published = publishers.values().map(|p| p.readings_published).sum();
        let publish_failures = publishers.values().map(|p| p.publish_failures).sum();

        MetricsSnapshot {
            publishers,
            readings_published,
            publish_failures,
            uptime_seconds: now.saturating_sub(self.uptime_start.load(Ordering::Relaxed)),
            timestamp: now,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

// Public metrics structures
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub publishers: BTreeMap<String, PublisherMetrics>,
    pub readings_published: u64,
    pub publish_failures: u64,
    pub uptime_seconds: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublisherMetrics {
    pub connected: bool,
    pub ticks: u64,
    pub readings_published: u64,
    pub ticks_skipped: u64,
    pub publish_failures: u64,
    pub source_errors: u64,
    pub connection_attempts: u64,
    pub connections_established: u64,
    pub connections_lost: u64,
    /// Unix seconds of the latest tick, 0 before the first one
    pub last_tick: u64,
}

// Helper functions
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_tick_metrics() {
        let collector = MetricsCollector::new();

        collector.tick(TelemetryKind::WaterUsage);
        collector.tick(TelemetryKind::WaterUsage);
        collector.reading_published(TelemetryKind::WaterUsage);
        collector.tick_skipped(TelemetryKind::WaterUsage);

        let water = collector.publisher(TelemetryKind::WaterUsage);
        assert_eq!(water.ticks, 2);
        assert_eq!(water.readings_published, 1);
        assert_eq!(water.ticks_skipped, 1);
        assert!(water.last_tick > 0);

        // Other kinds untouched
        assert_eq!(collector.publisher(TelemetryKind::ChemicalUsage).ticks, 0);
    }

    #[test]
    fn test_connection_metrics() {
        let collector = MetricsCollector::new();
        let kind = TelemetryKind::WaterPumpUsage;

        collector.connection_attempt(kind);
        collector.connection_established(kind);
        assert!(collector.publisher(kind).connected);

        collector.connection_lost(kind);
        collector.connection_attempt(kind);

        let pump = collector.publisher(kind);
        assert!(!pump.connected);
        assert_eq!(pump.connection_attempts, 2);
        assert_eq!(pump.connections_established, 1);
        assert_eq!(pump.connections_lost, 1);
    }

    #[test]
    fn test_snapshot_totals() {
        let collector = MetricsCollector::new();
        collector.reading_published(TelemetryKind::ChemicalUsage);
        collector.reading_published(TelemetryKind::WaterUsage);
        collector.publish_failed(TelemetryKind::WaterUsage);

        let snapshot = collector.get_metrics();
        assert_eq!(snapshot.publishers.len(), 3);
        assert_eq!(snapshot.readings_published, 2);
        assert_eq!(snapshot.publish_failures, 1);
        assert!(snapshot.publishers.contains_key("water_pump_usage"));
    }

    #[test]
    fn test_thread_safety() {
        let collector = Arc::new(MetricsCollector::new());

        let mut handles = vec![];

        for _ in 0..10 {
            let collector_clone = Arc::clone(&collector);
            let handle = thread::spawn(move || {
                for _ in 0..100 {
                    collector_clone.tick(TelemetryKind::ChemicalUsage);
                    collector_clone.reading_published(TelemetryKind::ChemicalUsage);
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let chemical = collector.publisher(TelemetryKind::ChemicalUsage);
        assert_eq!(chemical.ticks, 1000);
        assert_eq!(chemical.readings_published, 1000);
    }

    #[test]
    fn test_reset_functionality() {
        let collector = MetricsCollector::new();
        collector.tick(TelemetryKind::WaterUsage);
        collector.connection_established(TelemetryKind::WaterUsage);

        collector.reset();

        let water = collector.publisher(TelemetryKind::WaterUsage);
        assert_eq!(water.ticks, 0);
        assert!(!water.connected);
    }

    #[test]
    fn test_snapshot_serializes() {
        let collector = MetricsCollector::new();
        let json = serde_json::to_value(collector.get_metrics()).unwrap();
        assert!(json["publishers"]["water_usage"]["ticks"].is_u64());
    }
}
