//! MQTT client implementation
//!
//! This module separates pure functions from I/O operations for better testability.
//!
//! # Architecture
//!
//! - [`connection`] - Connection state, errors and `MqttOptions` construction
//! - [`message_handler`] - Pure event routing
//! - [`client`] - Impure I/O operations and coordination
//!
//! # Usage
//!
//! ```rust,no_run
//! use wsm_simulator::config::MqttSection;
//! use wsm_simulator::transport::{mqtt::MqttClient, Transport};
//!
//! # tokio_test::block_on(async {
//! let config = MqttSection {
//!     broker_url: "mqtt://localhost:1883".to_string(),
//!     username_env: None,
//!     password_env: None,
//!     keep_alive_secs: 60,
//!     reconnect_delay_secs: 5,
//! };
//!
//! let (events_tx, mut events_rx) = tokio::sync::mpsc::channel(8);
//! let client = MqttClient::new("water-usage-simulator", config)?;
//! client.connect(events_tx).await?;
//! let _outcome = events_rx.recv().await;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod message_handler;

pub use client::MqttClient;
pub use connection::{configure_mqtt_options, ConnectionState, MqttError};
pub use message_handler::{EventRoute, MessageHandler};
