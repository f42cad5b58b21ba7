//! Pure connection lifecycle of a publisher
//!
//! [`Lifecycle::transition`] maps the current state and an incoming event to the next state
//! plus the effects the actor has to carry out. It is the only place that decides when the
//! tick timer is armed or disarmed.

use crate::config::RearmPolicy;
use serde::Serialize;
use tracing::{info, warn};

/// Observable publisher state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PublisherState {
    /// Created, not started
    Idle,
    /// Connection attempt in flight; `attempt` counts consecutive attempts
    Connecting { attempt: u32 },
    /// Broker link up, timer armed
    Connected,
    /// Waiting out the reconnect delay; `attempt` is the number of failed attempts so far
    Disconnected { reason: String, attempt: u32 },
    /// Terminal
    Stopped,
}

impl PublisherState {
    pub fn is_connected(&self) -> bool {
        matches!(self, PublisherState::Connected)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, PublisherState::Stopped)
    }
}

/// Inputs of the lifecycle state machine
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    Start,
    /// Broker acknowledged a connection
    LinkUp,
    /// Connection attempt failed or established link dropped
    LinkDown(String),
    ReconnectDelayElapsed,
    Stop,
}

/// Delay before the first tick after arming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstTick {
    AfterDueTime,
    AfterPeriod,
}

/// Side effects requested by a transition, executed in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Connect,
    ArmTimer(FirstTick),
    DisarmTimer,
    ScheduleReconnect,
    CancelReconnect,
    CloseConnection,
}

/// Facts outside the state that transitions depend on
#[derive(Debug, Clone, Copy)]
pub struct LifecycleContext {
    pub rearm: RearmPolicy,
    /// Whether this publisher has been connected at least once
    pub connected_before: bool,
}

/// Result of applying one event
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: PublisherState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(next: PublisherState, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }

    fn stay(state: &PublisherState) -> Self {
        Self {
            next: state.clone(),
            effects: Vec::new(),
        }
    }
}

/// Pure lifecycle decision logic
pub struct Lifecycle;

impl Lifecycle {
    /// Determine next state and effects after an event (pure function)
    pub fn transition(
        state: &PublisherState,
        event: LifecycleEvent,
        context: LifecycleContext,
    ) -> Transition {
        use LifecycleEvent as E;
        use PublisherState as S;

        match (state, event) {
            (S::Stopped, _) => Transition::stay(state),

            (_, E::Stop) => Transition::to(
                S::Stopped,
                vec![
                    Effect::DisarmTimer,
                    Effect::CancelReconnect,
                    Effect::CloseConnection,
                ],
            ),

            (S::Idle, E::Start) => Transition::to(S::Connecting { attempt: 1 }, vec![Effect::Connect]),

            (S::Connecting { .. }, E::LinkUp) => Transition::to(
                S::Connected,
                vec![Effect::ArmTimer(Self::first_tick(context))],
            ),

            (S::Connecting { attempt }, E::LinkDown(reason)) => Transition::to(
                S::Disconnected {
                    reason,
                    attempt: *attempt,
                },
                vec![Effect::ScheduleReconnect],
            ),

            (S::Connected, E::LinkDown(reason)) => Transition::to(
                S::Disconnected { reason, attempt: 0 },
                vec![Effect::DisarmTimer, Effect::ScheduleReconnect],
            ),

            (S::Disconnected { attempt, .. }, E::ReconnectDelayElapsed) => Transition::to(
                S::Connecting {
                    attempt: attempt + 1,
                },
                vec![Effect::Connect],
            ),

            // Duplicate acks, stale link events and repeated starts change nothing
            _ => Transition::stay(state),
        }
    }

    /// Where the first tick lands when the timer is armed (pure function)
    pub fn first_tick(context: LifecycleContext) -> FirstTick {
        match (context.connected_before, context.rearm) {
            (false, _) | (true, RearmPolicy::DueTime) => FirstTick::AfterDueTime,
            (true, RearmPolicy::Period) => FirstTick::AfterPeriod,
        }
    }

    /// Log state transition
    pub fn log_state_transition(from: &PublisherState, to: &PublisherState) {
        match (from, to) {
            (PublisherState::Connecting { attempt }, PublisherState::Connected) => {
                info!(attempt, "Publisher connected, timer armed");
            }
            (PublisherState::Connected, PublisherState::Disconnected { reason, .. }) => {
                warn!(reason = %reason, "Connection lost, timer disarmed");
            }
            (PublisherState::Connecting { attempt }, PublisherState::Disconnected { reason, .. }) => {
                warn!(attempt, reason = %reason, "Connection attempt failed");
            }
            (PublisherState::Disconnected { .. }, PublisherState::Connecting { attempt }) => {
                info!(attempt, "Reconnecting");
            }
            (_, PublisherState::Stopped) => {
                info!("Publisher stopped");
            }
            _ if from != to => {
                info!("Publisher state: {:?} -> {:?}", from, to);
            }
            _ => {}
        }
    }
}
