//! Transport layer for publishing readings
//!
//! This module provides the transport abstraction used by the publishers and its MQTT
//! implementation. A transport never retries on its own: connection outcomes are reported as
//! [`LinkEvent`]s and the owning publisher decides when to try again.

use tokio::sync::mpsc;

pub mod mqtt;

/// Connection outcome reported by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Broker acknowledged the connection
    Connected,
    /// Connection attempt failed or an established link dropped
    Disconnected(String),
}

/// Transport trait for publishing readings
///
/// This trait provides an abstraction over the broker client to enable dependency injection
/// and testing. All methods take `&self` so one transport can be shared between the
/// publisher loop and its in-flight publish tasks.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Start a connection attempt.
    ///
    /// Returns once the attempt is under way. The outcome arrives later on `events`; an `Err`
    /// here means the attempt could not even be started.
    async fn connect(&self, events: mpsc::Sender<LinkEvent>) -> Result<(), Self::Error>;

    /// Close the connection, if any
    async fn disconnect(&self) -> Result<(), Self::Error>;

    /// Publish a payload to the given topic
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Self::Error>;

    /// Check if transport is currently connected
    fn is_connected(&self) -> bool;
}
