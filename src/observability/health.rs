//! Health check HTTP server for container orchestration
//!
//! Reports each publisher's lifecycle state, supporting both human operators and container
//! orchestration platforms.

use crate::observability::metrics::metrics;
use crate::publisher::PublisherState;
use crate::telemetry::TelemetryKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use warp::http::StatusCode;
use warp::Filter;

/// HTTP health check server
pub struct HealthServer {
    port: u16,
    publishers: Vec<(TelemetryKind, watch::Receiver<PublisherState>)>,
}

impl HealthServer {
    /// Create new health server
    pub fn new(port: u16) -> Self {
        Self {
            port,
            publishers: Vec::new(),
        }
    }

    /// Track a running publisher
    pub fn watch_publisher(
        mut self,
        kind: TelemetryKind,
        state: watch::Receiver<PublisherState>,
    ) -> Self {
        self.publishers.push((kind, state));
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn snapshot(&self) -> Vec<(TelemetryKind, PublisherState)> {
        self.publishers
            .iter()
            .map(|(kind, rx)| (*kind, rx.borrow().clone()))
            .collect()
    }

    /// Build the warp routes
    pub fn routes(
        self: Arc<Self>,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let health_server = self.clone();
        let ready_server = self;

        // GET /health - per-publisher status
        let health_route = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .and_then(move || {
                let server = health_server.clone();
                async move {
                    let status = evaluate_health(&server.snapshot(), current_timestamp());
                    let code = if status.status == "unhealthy" {
                        StatusCode::SERVICE_UNAVAILABLE
                    } else {
                        StatusCode::OK
                    };
                    Ok::<_, Infallible>(warp::reply::with_status(warp::reply::json(&status), code))
                }
            });

        // GET /metrics - complete metrics export
        let metrics_route = warp::path("metrics")
            .and(warp::path::end())
            .and(warp::get())
            .and_then(|| async move {
                Ok::<_, Infallible>(warp::reply::json(&metrics().get_metrics()))
            });

        // GET /ready - every publisher connected
        let ready_route = warp::path("ready")
            .and(warp::path::end())
            .and(warp::get())
            .and_then(move || {
                let server = ready_server.clone();
                async move {
                    let ready = is_ready(&server.snapshot());
                    let response = ReadinessResponse {
                        ready,
                        timestamp: current_timestamp(),
                    };
                    let code = if ready {
                        StatusCode::OK
                    } else {
                        StatusCode::SERVICE_UNAVAILABLE
                    };
                    Ok::<_, Infallible>(warp::reply::with_status(
                        warp::reply::json(&response),
                        code,
                    ))
                }
            });

        // GET /live - process liveness
        let live_route = warp::path("live")
            .and(warp::path::end())
            .and(warp::get())
            .and_then(|| async move {
                let response = LivenessResponse {
                    alive: true,
                    timestamp: current_timestamp(),
                };
                Ok::<_, Infallible>(warp::reply::json(&response))
            });

        health_route
            .or(metrics_route)
            .or(ready_route)
            .or(live_route)
    }

    /// Start the HTTP health server
    pub async fn start(self: Arc<Self>) {
        let port = self.port;
        tracing::info!("Starting health server on port {}", port);
        warp::serve(self.routes()).run(([0, 0, 0, 0], port)).await;
    }
}

/// Overall status from publisher states (pure function)
///
/// `healthy` when every publisher is connected, `degraded` while some are reconnecting,
/// `unhealthy` if any publisher stopped or none are tracked.
fn evaluate_health(states: &[(TelemetryKind, PublisherState)], now: u64) -> HealthStatus {
    let checks: BTreeMap<String, PublisherState> = states
        .iter()
        .map(|(kind, state)| (kind.as_str().to_string(), state.clone()))
        .collect();

    let status = if states.is_empty() || states.iter().any(|(_, s)| s.is_stopped()) {
        "unhealthy"
    } else if states.iter().all(|(_, s)| s.is_connected()) {
        "healthy"
    } else {
        "degraded"
    };

    HealthStatus {
        status: status.to_string(),
        timestamp: now,
        uptime_seconds: metrics().get_metrics().uptime_seconds,
        publishers: checks,
    }
}

fn is_ready(states: &[(TelemetryKind, PublisherState)]) -> bool {
    !states.is_empty() && states.iter().all(|(_, s)| s.is_connected())
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: String,
    timestamp: u64,
    uptime_seconds: u64,
    publishers: BTreeMap<String, PublisherState>,
}

#[derive(Debug, Serialize)]
struct ReadinessResponse {
    ready: bool,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
struct LivenessResponse {
    alive: bool,
    timestamp: u64,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
