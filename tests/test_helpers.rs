//! Test helpers and utilities for integration tests

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wsm_simulator::config::{RearmPolicy, SimulatorConfig, StoreSection};
use wsm_simulator::observability::MetricsCollector;
use wsm_simulator::publisher::{Publisher, PublisherHandle, PublisherSettings};
use wsm_simulator::store::{DocumentStore, EntitySampler, MemoryStore};
use wsm_simulator::telemetry::{source_for, TelemetryKind};
use wsm_simulator::testing::MockTransport;

/// Create a test configuration for integration tests
#[allow(dead_code)]
pub fn test_config() -> SimulatorConfig {
    SimulatorConfig::from_toml(
        r#"
[mqtt]
broker_url = "mqtt://localhost:1883"
"#,
    )
    .expect("Test config should parse")
}

/// Store with one in-stock chemical, one active pump and one customer
#[allow(dead_code)]
pub fn facility_store() -> MemoryStore {
    MemoryStore::from_value(json!({
        "Chemicals": [
            {"_id": "c1", "ChemicalName": "Chlorine", "Quantity": 3.0, "MinQuantity": 1.0, "MeasureUnit": "kg"},
            {"_id": "c-empty", "ChemicalName": "Alum", "Quantity": 0.0, "MinQuantity": 1.0}
        ],
        "Equipment": [
            {"_id": "e1", "Type": "Pump", "IsActive": true},
            {"_id": "e-off", "Type": "Pump", "IsActive": false},
            {"_id": "v1", "Type": "Valve", "IsActive": true}
        ],
        "Users": [
            {"_id": "u1", "Type": "Customer"},
            {"_id": "op1", "Type": "Operator"}
        ]
    }))
    .expect("Facility seed should load")
}

/// Collector isolated from the global one
#[allow(dead_code)]
pub fn local_metrics() -> &'static MetricsCollector {
    Box::leak(Box::new(MetricsCollector::new()))
}

/// Fast timing: no due time, one minute period, five second reconnect delay
#[allow(dead_code)]
pub fn minute_settings(kind: TelemetryKind, rearm: RearmPolicy) -> PublisherSettings {
    PublisherSettings {
        kind,
        due_time: Duration::ZERO,
        period: Duration::from_secs(60),
        reconnect_delay: Duration::from_secs(5),
        rearm,
    }
}

/// Start a publisher of `kind` reading from `store` through the mock transport
#[allow(dead_code)]
pub fn start_publisher(
    settings: PublisherSettings,
    store: Arc<dyn DocumentStore>,
    transport: Arc<MockTransport>,
    metrics: &'static MetricsCollector,
) -> PublisherHandle {
    let kind = settings.kind;
    let config = test_config();
    let source = source_for(
        kind,
        EntitySampler::new(store),
        config.distribution(kind).clone(),
        &StoreSection::default(),
    );

    Publisher::new(settings, transport, source)
        .with_metrics(metrics)
        .start()
}
