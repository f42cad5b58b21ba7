//! Impure I/O operations for MQTT client
//!
//! This module handles all impure I/O operations including network communication,
//! async coordination, and integration with the rumqttc client.

use super::connection::{configure_mqtt_options, ConnectionState, MqttError};
use super::message_handler::{EventRoute, MessageHandler};
use crate::config::MqttSection;
use crate::mqtt_span;
use crate::transport::{LinkEvent, Transport};
use async_trait::async_trait;
use rumqttc::v5::mqttbytes::v5::PublishProperties;
use rumqttc::v5::{AsyncClient, EventLoop};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

/// Request channel capacity between `AsyncClient` and its event loop
const REQUEST_CAPACITY: usize = 10;

/// Time the event loop gets to flush the DISCONNECT packet
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// MQTT transport client owned by one publisher
///
/// Every `connect` builds a fresh client and event loop. The event loop task stops at the
/// first error instead of retrying; the publisher schedules the next attempt.
pub struct MqttClient {
    client_id: String,
    config: MqttSection,
    client: Arc<Mutex<Option<AsyncClient>>>,
    event_loop_handle: Mutex<Option<JoinHandle<()>>>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl MqttClient {
    /// Create an unconnected client; the broker URL is validated up front
    pub fn new(client_id: &str, config: MqttSection) -> Result<Self, MqttError> {
        configure_mqtt_options(client_id, &config)?;
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);

        Ok(MqttClient {
            client_id: client_id.to_string(),
            config,
            client: Arc::new(Mutex::new(None)),
            event_loop_handle: Mutex::new(None),
            state_tx,
            state_rx,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Helper method to create new MQTT connection and event loop
    fn create_connection(
        client_id: &str,
        config: &MqttSection,
    ) -> Result<(AsyncClient, EventLoop), MqttError> {
        let mqtt_options = configure_mqtt_options(client_id, config)?;
        Ok(AsyncClient::new(mqtt_options, REQUEST_CAPACITY))
    }

    /// Drive one connection until it is acknowledged and later lost
    async fn run_event_loop(
        client_id: String,
        mut event_loop: EventLoop,
        state_tx: watch::Sender<ConnectionState>,
        events: mpsc::Sender<LinkEvent>,
    ) {
        loop {
            let route = match event_loop.poll().await {
                Ok(event) => MessageHandler::route_mqtt_event(&event),
                Err(e) => EventRoute::Disconnected(e.to_string()),
            };

            match &route {
                EventRoute::ConnectionAcknowledged => {
                    info!(client_id = %client_id, "MQTT connection acknowledged");
                    let _ = state_tx.send(ConnectionState::Connected);
                }
                EventRoute::Disconnected(reason) => {
                    warn!(client_id = %client_id, reason = %reason, "MQTT connection ended");
                    let _ = state_tx.send(ConnectionState::Disconnected(reason.clone()));
                }
                EventRoute::InfrastructureEvent(event) => {
                    debug!(target: "mqtt_transport", client_id = %client_id, "MQTT event: {}", event);
                }
                EventRoute::OutgoingEvent => {}
            }

            if let Some(link_event) = MessageHandler::link_event(&route) {
                let stop = matches!(link_event, LinkEvent::Disconnected(_));
                if events.send(link_event).await.is_err() || stop {
                    break;
                }
            }
        }
        debug!(client_id = %client_id, "MQTT event loop stopped");
    }

    /// Abort the event loop task of a previous connection, if still running
    async fn abort_event_loop(&self) {
        if let Some(handle) = self.event_loop_handle.lock().await.take() {
            handle.abort();
        }
    }

    /// Get current connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to connection state changes
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Check connection state before operations
    fn check_connection_state(&self) -> Result<(), MqttError> {
        let current_state = self.connection_state();
        if !current_state.can_publish() {
            return Err(MqttError::NotConnected {
                state: current_state,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MqttClient {
    type Error = MqttError;

    async fn connect(&self, events: mpsc::Sender<LinkEvent>) -> Result<(), Self::Error> {
        let (client, event_loop) = Self::create_connection(&self.client_id, &self.config)?;

        self.abort_event_loop().await;
        *self.client.lock().await = Some(client);
        let _ = self.state_tx.send(ConnectionState::Connecting);

        info!(
            client_id = %self.client_id,
            broker_url = %self.config.broker_url,
            "Connecting to MQTT broker"
        );

        let span = mqtt_span!(client_id = %self.client_id);
        let handle = tokio::spawn(
            Self::run_event_loop(
                self.client_id.clone(),
                event_loop,
                self.state_tx.clone(),
                events,
            )
            .instrument(span),
        );
        *self.event_loop_handle.lock().await = Some(handle);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Self::Error> {
        let client = self.client.lock().await.take();
        let was_connected = self.connection_state().can_publish();
        let _ = self
            .state_tx
            .send(ConnectionState::Disconnected("Client disconnected".to_string()));

        let result = match client {
            Some(client) if was_connected => client
                .disconnect()
                .await
                .map_err(|e| MqttError::ConnectionFailed(Box::new(e))),
            _ => Ok(()),
        };

        if let Some(handle) = self.event_loop_handle.lock().await.take() {
            let abort = handle.abort_handle();
            if tokio::time::timeout(DISCONNECT_GRACE, handle).await.is_err() {
                abort.abort();
            }
        }

        info!(client_id = %self.client_id, "MQTT client disconnected");
        result
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Self::Error> {
        self.check_connection_state()?;

        let qos = MessageHandler::determine_qos_level(false);
        // Cloned out so a full request queue never blocks connect or disconnect on the lock
        let client = self
            .client
            .lock()
            .await
            .clone()
            .ok_or_else(|| MqttError::NotConnected {
                state: self.connection_state(),
            })?;
        client
            .publish_with_properties(topic, qos, false, payload, PublishProperties::default())
            .await
            .map_err(|e| MqttError::PublishFailed(Box::new(e)))?;

        debug!(client_id = %self.client_id, topic = %topic, "Published reading");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connection_state().can_publish()
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        // Can't await here; only make sure the background task goes away
        if let Some(handle) = self.event_loop_handle.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(broker_url: &str) -> MqttSection {
        MqttSection {
            broker_url: broker_url.to_string(),
            username_env: None,
            password_env: None,
            keep_alive_secs: 60,
            reconnect_delay_secs: 5,
        }
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let result = MqttClient::new("water-usage-simulator", config("not a url"));
        assert!(matches!(result, Err(MqttError::InvalidBrokerUrl(_))));
    }

    #[tokio::test]
    async fn test_connection_state_before_connect() {
        // Arrange: Create client without connecting
        let client = MqttClient::new("water-usage-simulator", config("mqtt://localhost:1883"))
            .unwrap();

        // Assert: Idle and not publishable
        assert_eq!(client.connection_state(), ConnectionState::Idle);
        assert!(!client.is_connected());
        assert_eq!(client.client_id(), "water-usage-simulator");
    }

    #[tokio::test]
    async fn test_publish_fails_without_connection() {
        let client = MqttClient::new("water-usage-simulator", config("mqtt://localhost:1883"))
            .unwrap();

        let result = client.publish("WSM/WaterUsage", b"{}".to_vec()).await;

        assert!(matches!(
            result,
            Err(MqttError::NotConnected {
                state: ConnectionState::Idle
            })
        ));
    }

    #[tokio::test]
    async fn test_blocked_publish_does_not_hold_client_lock() {
        // Arrange: Connected client whose event loop is never polled, so the request queue fills
        let client = Arc::new(
            MqttClient::new("water-usage-simulator", config("mqtt://localhost:1883")).unwrap(),
        );
        let (async_client, _event_loop) =
            MqttClient::create_connection(client.client_id(), &client.config).unwrap();
        *client.client.lock().await = Some(async_client);
        client.state_tx.send(ConnectionState::Connected).unwrap();

        for _ in 0..REQUEST_CAPACITY {
            client
                .publish("WSM/WaterUsage", b"{}".to_vec())
                .await
                .unwrap();
        }

        // Act: One more publish waits for queue space
        let pending = tokio::spawn({
            let client = client.clone();
            async move { client.publish("WSM/WaterUsage", b"{}".to_vec()).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Assert: The waiting publish leaves the client slot free
        assert!(!pending.is_finished());
        assert!(client.client.try_lock().is_ok());

        pending.abort();
    }

    #[tokio::test]
    async fn test_disconnect_without_connection() {
        let client = MqttClient::new("water-usage-simulator", config("mqtt://localhost:1883"))
            .unwrap();

        let result = client.disconnect().await;

        assert!(result.is_ok(), "Disconnect should not fail even if not connected");
        assert!(matches!(
            client.connection_state(),
            ConnectionState::Disconnected(_)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_broker_reports_disconnected() {
        // Arrange: Nothing listens on port 1
        let client =
            MqttClient::new("water-usage-simulator", config("mqtt://127.0.0.1:1")).unwrap();
        let (events_tx, mut events_rx) = mpsc::channel(4);

        // Act: Start the attempt; it returns before the outcome is known
        client.connect(events_tx).await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(10), events_rx.recv())
            .await
            .expect("connection outcome should arrive");

        // Assert: Failure is reported as an event, not retried internally
        assert!(matches!(event, Some(LinkEvent::Disconnected(_))));
        assert!(!client.is_connected());
    }
}
