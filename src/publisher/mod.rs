//! Periodic telemetry publishers
//!
//! Each publisher is a single tokio task multiplexing four inputs with a biased
//! `tokio::select!`: the stop signal, link events from its transport, the reconnect deadline
//! and the tick deadline. Everything that changes the publisher's state happens inside that
//! task, in order, so no locks are needed. Publishes are submitted from spawned tasks and
//! never awaited by the tick.

pub mod lifecycle;
pub mod scheduler;

pub use lifecycle::{
    Effect, FirstTick, Lifecycle, LifecycleContext, LifecycleEvent, PublisherState, Transition,
};
pub use scheduler::TickScheduler;

use crate::config::{RearmPolicy, SimulatorConfig};
use crate::error::SimulatorError;
use crate::observability::metrics::{metrics, MetricsCollector};
use crate::publisher_span;
use crate::telemetry::{ReadingSource, TelemetryKind};
use crate::transport::{LinkEvent, Transport};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

/// Link event buffer between a transport and its publisher
const LINK_EVENT_CAPACITY: usize = 16;

/// Timing of one publisher
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherSettings {
    pub kind: TelemetryKind,
    pub due_time: Duration,
    pub period: Duration,
    pub reconnect_delay: Duration,
    pub rearm: RearmPolicy,
}

impl PublisherSettings {
    pub fn from_config(kind: TelemetryKind, config: &SimulatorConfig) -> Self {
        let distribution = config.distribution(kind);
        Self {
            kind,
            due_time: distribution.due_time(),
            period: distribution.period(),
            reconnect_delay: config.mqtt.reconnect_delay(),
            rearm: config.simulation.rearm_on_reconnect,
        }
    }
}

/// Unstarted publisher
pub struct Publisher<T: Transport + 'static> {
    settings: PublisherSettings,
    transport: Arc<T>,
    source: Box<dyn ReadingSource>,
    metrics: &'static MetricsCollector,
}

impl<T: Transport + 'static> Publisher<T> {
    pub fn new(settings: PublisherSettings, transport: Arc<T>, source: Box<dyn ReadingSource>) -> Self {
        Self {
            settings,
            transport,
            source,
            metrics: metrics(),
        }
    }

    /// Record metrics somewhere other than the global collector
    pub fn with_metrics(mut self, metrics: &'static MetricsCollector) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn kind(&self) -> TelemetryKind {
        self.settings.kind
    }

    /// Spawn the publisher task and start connecting; returns immediately
    pub fn start(self) -> PublisherHandle {
        let kind = self.settings.kind;
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(PublisherState::Idle);

        let span = publisher_span!(kind = %kind);
        let actor = PublisherActor::new(self, state_tx);
        let join = tokio::spawn(actor.run(stop_rx).instrument(span));

        PublisherHandle {
            kind,
            stop_tx,
            state_rx,
            join,
        }
    }
}

/// Control and observation of a running publisher
#[derive(Debug)]
pub struct PublisherHandle {
    kind: TelemetryKind,
    stop_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<PublisherState>,
    join: JoinHandle<()>,
}

impl PublisherHandle {
    pub fn kind(&self) -> TelemetryKind {
        self.kind
    }

    /// Current lifecycle state
    pub fn state(&self) -> PublisherState {
        self.state_rx.borrow().clone()
    }

    /// Receiver that observes every state change
    pub fn state_receiver(&self) -> watch::Receiver<PublisherState> {
        self.state_rx.clone()
    }

    /// Stop the publisher and wait for its task to finish.
    ///
    /// The timer is disarmed and the connection closed; in-flight publishes are not awaited.
    pub async fn stop(self) -> Result<(), SimulatorError> {
        let _ = self.stop_tx.send(true);
        self.join
            .await
            .map_err(|e| SimulatorError::internal(format!("{} publisher task failed: {e}", self.kind)))
    }
}

/// State owned by the publisher task
struct PublisherActor<T: Transport + 'static> {
    settings: PublisherSettings,
    transport: Arc<T>,
    source: Box<dyn ReadingSource>,
    metrics: &'static MetricsCollector,
    state: PublisherState,
    state_tx: watch::Sender<PublisherState>,
    connected_before: bool,
    ticks: TickScheduler,
    reconnect_at: Option<Instant>,
    events_tx: mpsc::Sender<LinkEvent>,
    events_rx: mpsc::Receiver<LinkEvent>,
}

impl<T: Transport + 'static> PublisherActor<T> {
    fn new(publisher: Publisher<T>, state_tx: watch::Sender<PublisherState>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(LINK_EVENT_CAPACITY);
        let ticks = TickScheduler::new(publisher.settings.due_time, publisher.settings.period);

        Self {
            settings: publisher.settings,
            transport: publisher.transport,
            source: publisher.source,
            metrics: publisher.metrics,
            state: PublisherState::Idle,
            state_tx,
            connected_before: false,
            ticks,
            reconnect_at: None,
            events_tx,
            events_rx,
        }
    }

    async fn run(mut self, mut stop_rx: watch::Receiver<bool>) {
        info!(
            topic = self.settings.kind.topic(),
            period_secs = self.settings.period.as_secs(),
            due_time_secs = self.settings.due_time.as_secs(),
            "Starting publisher"
        );
        self.handle(LifecycleEvent::Start).await;

        while !self.state.is_stopped() {
            let event = tokio::select! {
                biased;

                // Stop has priority; a dropped handle counts as stop
                changed = stop_rx.changed() => {
                    if changed.is_ok() && !*stop_rx.borrow() {
                        continue;
                    }
                    LifecycleEvent::Stop
                }

                Some(link_event) = self.events_rx.recv() => match link_event {
                    LinkEvent::Connected => LifecycleEvent::LinkUp,
                    LinkEvent::Disconnected(reason) => LifecycleEvent::LinkDown(reason),
                },

                _ = sleep_until_opt(self.reconnect_at) => {
                    self.reconnect_at = None;
                    LifecycleEvent::ReconnectDelayElapsed
                }

                _ = self.ticks.wait() => {
                    self.ticks.advance();
                    self.tick().await;
                    continue;
                }
            };

            self.handle(event).await;
        }
    }

    /// Apply an event and every follow-up event its effects produce
    async fn handle(&mut self, event: LifecycleEvent) {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let context = LifecycleContext {
                rearm: self.settings.rearm,
                connected_before: self.connected_before,
            };
            let transition = Lifecycle::transition(&self.state, event, context);

            Lifecycle::log_state_transition(&self.state, &transition.next);
            self.record_transition(&transition.next);
            self.state = transition.next;
            let _ = self.state_tx.send(self.state.clone());

            for effect in transition.effects {
                if let Some(follow_up) = self.execute(effect).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    fn record_transition(&mut self, next: &PublisherState) {
        let kind = self.settings.kind;
        match (&self.state, next) {
            (PublisherState::Connecting { .. }, PublisherState::Connected) => {
                self.connected_before = true;
                self.metrics.connection_established(kind);
            }
            (PublisherState::Connected, PublisherState::Disconnected { .. }) => {
                self.metrics.connection_lost(kind);
            }
            (_, PublisherState::Stopped) => {
                self.metrics.connection_closed(kind);
            }
            _ => {}
        }
    }

    /// Carry out one effect; a failed connect comes back as a `LinkDown`
    async fn execute(&mut self, effect: Effect) -> Option<LifecycleEvent> {
        match effect {
            Effect::Connect => {
                self.metrics.connection_attempt(self.settings.kind);
                if let Err(e) = self.transport.connect(self.events_tx.clone()).await {
                    return Some(LifecycleEvent::LinkDown(e.to_string()));
                }
            }
            Effect::ArmTimer(first) => self.ticks.arm(first),
            Effect::DisarmTimer => self.ticks.disarm(),
            Effect::ScheduleReconnect => {
                debug!(
                    delay_secs = self.settings.reconnect_delay.as_secs(),
                    "Scheduling reconnect"
                );
                self.reconnect_at = Some(Instant::now() + self.settings.reconnect_delay);
            }
            Effect::CancelReconnect => self.reconnect_at = None,
            Effect::CloseConnection => {
                if let Err(e) = self.transport.disconnect().await {
                    warn!(error = %e, "Failed to close broker connection");
                }
            }
        }
        None
    }

    /// One publish cycle: sample, build, serialize, submit
    async fn tick(&mut self) {
        let kind = self.settings.kind;
        self.metrics.tick(kind);

        let reading = match self.source.next_reading().await {
            Ok(Some(reading)) => reading,
            Ok(None) => {
                self.metrics.tick_skipped(kind);
                info!("No matching entity, skipping tick");
                return;
            }
            Err(e) => {
                self.metrics.source_error(kind);
                warn!(error = %e, "Failed to sample entity, skipping tick");
                return;
            }
        };

        let payload = match reading.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %SimulatorError::serialization(kind, e), "Dropping reading");
                return;
            }
        };

        info!(
            topic = reading.topic(),
            payload = %String::from_utf8_lossy(&payload),
            "Publishing reading"
        );
        self.spawn_publish(reading.topic(), payload);
    }

    /// Fire-and-forget publish; the outcome is only logged
    fn spawn_publish(&self, topic: &'static str, payload: Vec<u8>) {
        let transport = Arc::clone(&self.transport);
        let metrics = self.metrics;
        let kind = self.settings.kind;

        tokio::spawn(
            async move {
                match transport.publish(topic, payload).await {
                    Ok(()) => metrics.reading_published(kind),
                    Err(e) => {
                        metrics.publish_failed(kind);
                        warn!(topic, error = %e, "Publish failed");
                    }
                }
            }
            .in_current_span(),
        );
    }
}

/// Sleep until the deadline, or forever without one
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use crate::telemetry::Reading;
    use crate::testing::mocks::MockTransport;
    use async_trait::async_trait;

    /// Source producing a fixed water usage reading
    struct FixedSource;

    #[async_trait]
    impl ReadingSource for FixedSource {
        fn kind(&self) -> TelemetryKind {
            TelemetryKind::WaterUsage
        }

        async fn next_reading(&mut self) -> Result<Option<Reading>, StoreError> {
            Ok(Reading::build(TelemetryKind::WaterUsage, Some("u1"), 4.0))
        }
    }

    fn settings() -> PublisherSettings {
        PublisherSettings {
            kind: TelemetryKind::WaterUsage,
            due_time: Duration::ZERO,
            period: Duration::from_secs(60),
            reconnect_delay: Duration::from_secs(5),
            rearm: RearmPolicy::DueTime,
        }
    }

    fn local_metrics() -> &'static MetricsCollector {
        Box::leak(Box::new(MetricsCollector::new()))
    }

    #[test]
    fn test_settings_from_config() {
        let config = SimulatorConfig::test_config();
        let settings = PublisherSettings::from_config(TelemetryKind::WaterPumpUsage, &config);

        assert_eq!(settings.period, Duration::from_secs(900));
        assert_eq!(settings.due_time, Duration::ZERO);
        assert_eq!(settings.reconnect_delay, Duration::from_secs(5));
        assert_eq!(settings.rearm, RearmPolicy::DueTime);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_while_connected() {
        // Arrange
        let transport = Arc::new(MockTransport::new());
        let metrics = local_metrics();
        let handle = Publisher::new(settings(), transport.clone(), Box::new(FixedSource))
            .with_metrics(metrics)
            .start();

        // Act: ticks at 0, 60, 120
        tokio::time::sleep(Duration::from_secs(150)).await;

        // Assert
        assert_eq!(handle.state(), PublisherState::Connected);
        assert_eq!(transport.published_count(), 3);
        assert_eq!(metrics.publisher(TelemetryKind::WaterUsage).ticks, 3);
        assert_eq!(transport.published()[0].0, "WSM/WaterUsage");

        handle.stop().await.unwrap();
        assert_eq!(transport.disconnect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_broker_retries_with_fixed_delay() {
        let transport = Arc::new(MockTransport::new().unreachable());
        let handle = Publisher::new(settings(), transport.clone(), Box::new(FixedSource))
            .with_metrics(local_metrics())
            .start();

        // Attempts at 0, 5, 10, 15, 20
        tokio::time::sleep(Duration::from_secs(22)).await;

        assert_eq!(transport.connect_attempts(), 5);
        assert_eq!(transport.published_count(), 0);
        assert!(matches!(
            handle.state(),
            PublisherState::Disconnected { attempt: 5, .. }
        ));

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_terminal() {
        let transport = Arc::new(MockTransport::new());
        let handle = Publisher::new(settings(), transport.clone(), Box::new(FixedSource))
            .with_metrics(local_metrics())
            .start();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let state_rx = handle.state_receiver();
        handle.stop().await.unwrap();

        assert_eq!(*state_rx.borrow(), PublisherState::Stopped);
        let published = transport.published_count();
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(transport.published_count(), published);
    }
}
