//! Mock implementations for testing
//!
//! Provides a mock [`Transport`] with a controllable broker and a [`DocumentStore`] wrapper
//! that can be switched into failure mode, so publishers can be exercised without an MQTT
//! broker.

use crate::error::SimulatorError;
use crate::store::{DocumentStore, Filter, MemoryStore, StoreError};
use crate::transport::{LinkEvent, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

pub type PublishedMessage = (String, Vec<u8>);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock transport for testing
///
/// Connection attempts succeed immediately while the broker is reachable. Outcomes are
/// delivered through the link event channel, like the real client does.
#[derive(Debug)]
pub struct MockTransport {
    pub published_messages: Arc<Mutex<Vec<PublishedMessage>>>,
    pub should_fail: bool,
    reachable: AtomicBool,
    connected: AtomicBool,
    connect_attempts: AtomicU64,
    disconnects: AtomicU64,
    events: Mutex<Option<mpsc::Sender<LinkEvent>>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            published_messages: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
            reachable: AtomicBool::new(true),
            connected: AtomicBool::new(false),
            connect_attempts: AtomicU64::new(0),
            disconnects: AtomicU64::new(0),
            events: Mutex::new(None),
        }
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every publish fails
    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Broker starts out unreachable
    pub fn unreachable(self) -> Self {
        self.reachable.store(false, Ordering::SeqCst);
        self
    }

    /// Make later connection attempts succeed or fail
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Simulate the broker dropping an established connection
    pub fn drop_connection(&self, reason: &str) {
        self.connected.store(false, Ordering::SeqCst);
        self.notify(LinkEvent::Disconnected(reason.to_string()));
    }

    /// Deliver an extra connection acknowledgement
    pub fn ack_connection(&self) {
        self.connected.store(true, Ordering::SeqCst);
        self.notify(LinkEvent::Connected);
    }

    fn notify(&self, event: LinkEvent) {
        if let Some(events) = lock(&self.events).as_ref() {
            let _ = events.try_send(event);
        }
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        lock(&self.published_messages).clone()
    }

    pub fn published_count(&self) -> usize {
        lock(&self.published_messages).len()
    }

    /// Published payloads parsed as JSON
    pub fn published_json(&self) -> Vec<(String, Value)> {
        self.published()
            .into_iter()
            .filter_map(|(topic, payload)| {
                serde_json::from_slice(&payload)
                    .ok()
                    .map(|json| (topic, json))
            })
            .collect()
    }

    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> u64 {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn clear_history(&self) {
        lock(&self.published_messages).clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Error = SimulatorError;

    async fn connect(&self, events: mpsc::Sender<LinkEvent>) -> Result<(), Self::Error> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        *lock(&self.events) = Some(events);

        if self.reachable.load(Ordering::SeqCst) {
            self.ack_connection();
        } else {
            self.connected.store(false, Ordering::SeqCst);
            self.notify(LinkEvent::Disconnected(
                "Mock broker unreachable".to_string(),
            ));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Self::Error> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Self::Error> {
        if self.should_fail {
            return Err(SimulatorError::internal("Mock publish failure"));
        }
        if !self.is_connected() {
            return Err(SimulatorError::internal("Mock transport not connected"));
        }

        lock(&self.published_messages).push((topic.to_string(), payload));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Document store wrapper with switchable failures
#[derive(Debug, Default)]
pub struct MockStore {
    inner: MemoryStore,
    pub should_fail: AtomicBool,
    queries: AtomicU64,
}

impl MockStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            should_fail: AtomicBool::new(false),
            queries: AtomicU64::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.should_fail.store(failing, Ordering::SeqCst);
    }

    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn sample_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("Mock store failure".to_string()));
        }
        self.inner.sample_one(collection, filter).await
    }
}
