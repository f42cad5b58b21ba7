//! Telemetry kinds and their fixed broker topics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chemical usage readings topic
pub const TOPIC_CHEMICAL_USAGE: &str = "WSM/ChemicalUsage";
/// Water pump usage readings topic
pub const TOPIC_WATER_PUMP_USAGE: &str = "WSM/WaterPumpUsage";
/// Water usage readings topic
pub const TOPIC_WATER_USAGE: &str = "WSM/WaterUsage";

/// One of the three simulated telemetry categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryKind {
    ChemicalUsage,
    WaterPumpUsage,
    WaterUsage,
}

impl TelemetryKind {
    pub const ALL: [TelemetryKind; 3] = [
        TelemetryKind::ChemicalUsage,
        TelemetryKind::WaterPumpUsage,
        TelemetryKind::WaterUsage,
    ];

    /// Broker topic, constant for the process lifetime
    pub fn topic(&self) -> &'static str {
        match self {
            TelemetryKind::ChemicalUsage => TOPIC_CHEMICAL_USAGE,
            TelemetryKind::WaterPumpUsage => TOPIC_WATER_PUMP_USAGE,
            TelemetryKind::WaterUsage => TOPIC_WATER_USAGE,
        }
    }

    /// MQTT client identifier used by this kind's publisher
    pub fn client_id(&self) -> &'static str {
        match self {
            TelemetryKind::ChemicalUsage => "chemical-usage-simulator",
            TelemetryKind::WaterPumpUsage => "water-pump-usage-simulator",
            TelemetryKind::WaterUsage => "water-usage-simulator",
        }
    }

    /// Stable short name used in logs, metrics and the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryKind::ChemicalUsage => "chemical_usage",
            TelemetryKind::WaterPumpUsage => "water_pump_usage",
            TelemetryKind::WaterUsage => "water_usage",
        }
    }

    /// Dense index for per-kind arrays
    pub(crate) fn index(&self) -> usize {
        match self {
            TelemetryKind::ChemicalUsage => 0,
            TelemetryKind::WaterPumpUsage => 1,
            TelemetryKind::WaterUsage => 2,
        }
    }
}

impl fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TelemetryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "chemical_usage" | "chemical" => Ok(TelemetryKind::ChemicalUsage),
            "water_pump_usage" | "pump" => Ok(TelemetryKind::WaterPumpUsage),
            "water_usage" | "water" => Ok(TelemetryKind::WaterUsage),
            other => Err(format!("Unknown telemetry kind: {other}")),
        }
    }
}
