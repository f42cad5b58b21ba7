//! WSM Simulator
//!
//! Simulated IoT telemetry for a water and chemical management system. Three independent
//! publishers (chemical usage, water pump usage and water usage) periodically sample an entity
//! from a document store, generate a plausible value and publish a JSON reading to an MQTT
//! broker.
//!
//! # Overview
//!
//! - [`config`]: TOML configuration with per-kind timing and distribution parameters
//! - [`store`]: read-only document store and typed random entity sampling
//! - [`simulation`]: uniform and clamped Gaussian value generation
//! - [`telemetry`]: topics, readings, payload serialization and per-kind reading sources
//! - [`publisher`]: publisher lifecycle, tick scheduling and fixed-delay reconnects
//! - [`transport`]: MQTT transport with link event reporting
//! - [`observability`]: structured logging, metrics and health endpoints
//!
//! # Quick Start
//!
//! ```rust
//! use wsm_simulator::telemetry::{Reading, TelemetryKind};
//!
//! let reading = Reading::build(TelemetryKind::WaterUsage, Some("5f1c"), 12.5).unwrap();
//! let payload = String::from_utf8(reading.to_payload().unwrap()).unwrap();
//!
//! assert_eq!(reading.topic(), "WSM/WaterUsage");
//! assert!(payload.starts_with(r#"{"Id":"5f1c","Data":{"Timestamp":"#));
//! ```

pub mod config;
pub mod error;
pub mod observability;
pub mod publisher;
pub mod simulation;
pub mod store;
pub mod telemetry;
pub mod testing;
pub mod transport;

pub use config::{ConfigError, DistributionSettings, RearmPolicy, SimulatorConfig};
pub use error::{SimulatorError, SimulatorResult};
pub use publisher::{Publisher, PublisherHandle, PublisherSettings, PublisherState};
pub use simulation::{Distribution, ValueGenerator};
pub use store::{DocumentStore, EntitySampler, MemoryStore, StoreError};
pub use telemetry::{Reading, ReadingSource, TelemetryKind};
pub use transport::mqtt::MqttClient;
pub use transport::{LinkEvent, Transport};
