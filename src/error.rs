//! Top-level error type for the simulator
//!
//! Per-module errors (`ConfigError`, `StoreError`, `MqttError`) stay close to where they are
//! raised and convert into [`SimulatorError`] at the process boundary.

use crate::telemetry::TelemetryKind;
use thiserror::Error;

/// Main error type for simulator operations
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] crate::transport::mqtt::MqttError),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Failed to serialize {kind} reading: {source}")]
    Serialization {
        kind: TelemetryKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SimulatorError {
    /// Create serialization error
    pub fn serialization(kind: TelemetryKind, source: serde_json::Error) -> Self {
        Self::Serialization { kind, source }
    }

    /// Create internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result type for simulator operations
pub type SimulatorResult<T> = Result<T, SimulatorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::store::StoreError;

    #[test]
    fn test_internal_error_constructor() {
        let error = SimulatorError::internal("publisher task panicked");
        assert!(matches!(error, SimulatorError::Internal { .. }));
        assert_eq!(error.to_string(), "Internal error: publisher task panicked");
    }

    #[test]
    fn test_config_error_converts() {
        let error: SimulatorError = ConfigError::InvalidConfig("bad".to_string()).into();
        assert!(matches!(error, SimulatorError::Config(_)));
        assert!(error.to_string().contains("Invalid configuration: bad"));
    }

    #[test]
    fn test_store_error_converts() {
        let error: SimulatorError = StoreError::UnknownCollection("Users".to_string()).into();
        assert_eq!(error.to_string(), "Store error: Unknown collection: Users");
    }

    #[test]
    fn test_serialization_error_names_kind() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = SimulatorError::serialization(TelemetryKind::WaterUsage, source);
        assert!(error.to_string().starts_with("Failed to serialize water_usage reading"));
    }
}
