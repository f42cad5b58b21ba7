//! Simulator configuration
//!
//! Loaded from a TOML file. Every section except `[mqtt]` is optional and falls back to the
//! defaults the simulator has always run with (15 minute period, no initial delay, 5 second
//! reconnect delay).

use crate::simulation::Distribution;
use crate::telemetry::TelemetryKind;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Main simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulatorConfig {
    pub mqtt: MqttSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub simulation: SimulationSection,
    /// Health/metrics HTTP endpoint, disabled when absent
    pub http: Option<HttpSection>,
    #[serde(
        default = "DistributionSettings::chemical_usage",
        deserialize_with = "chemical_usage_settings"
    )]
    pub chemical_usage: DistributionSettings,
    #[serde(
        default = "DistributionSettings::water_pump_usage",
        deserialize_with = "water_pump_usage_settings"
    )]
    pub water_pump_usage: DistributionSettings,
    #[serde(
        default = "DistributionSettings::water_usage",
        deserialize_with = "water_usage_settings"
    )]
    pub water_usage: DistributionSettings,
}

/// MQTT broker connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// Broker URL, `mqtt://host:port` or `mqtts://host:port`
    pub broker_url: String,
    /// Environment variable containing username
    pub username_env: Option<String>,
    /// Environment variable containing password
    pub password_env: Option<String>,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// Fixed delay between reconnection attempts
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

impl MqttSection {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

fn default_keep_alive() -> u64 {
    60
}

fn default_reconnect_delay() -> u64 {
    5
}

/// Document store location and collection names
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreSection {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_chemical_collection")]
    pub chemical_collection: String,
    #[serde(default = "default_equipment_collection")]
    pub equipment_collection: String,
    #[serde(default = "default_user_collection")]
    pub user_collection: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            chemical_collection: default_chemical_collection(),
            equipment_collection: default_equipment_collection(),
            user_collection: default_user_collection(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/store.json")
}

fn default_chemical_collection() -> String {
    "Chemicals".to_string()
}

fn default_equipment_collection() -> String {
    "Equipment".to_string()
}

fn default_user_collection() -> String {
    "Users".to_string()
}

/// Cross-publisher simulation behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SimulationSection {
    #[serde(default)]
    pub rearm_on_reconnect: RearmPolicy,
}

/// Where the first tick after a reconnect lands
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RearmPolicy {
    /// Restart from the configured due time, as on the very first connect
    #[default]
    DueTime,
    /// Wait one full period before the first tick
    Period,
}

/// Health/metrics HTTP server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpSection {
    #[serde(default = "default_http_port")]
    pub port: u16,
}

fn default_http_port() -> u16 {
    8080
}

/// Timing and distribution parameters of one telemetry kind
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DistributionSettings {
    pub enabled: bool,
    /// Delay before the first tick after connecting
    pub due_time_secs: u64,
    pub period_secs: u64,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Fields present in a `[<kind>]` table; missing ones keep the kind's defaults
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DistributionOverrides {
    enabled: Option<bool>,
    due_time_secs: Option<u64>,
    period_secs: Option<u64>,
    mean: Option<f64>,
    std_dev: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
}

impl DistributionOverrides {
    fn apply(self, base: DistributionSettings) -> DistributionSettings {
        DistributionSettings {
            enabled: self.enabled.unwrap_or(base.enabled),
            due_time_secs: self.due_time_secs.unwrap_or(base.due_time_secs),
            period_secs: self.period_secs.unwrap_or(base.period_secs),
            mean: self.mean.unwrap_or(base.mean),
            std_dev: self.std_dev.unwrap_or(base.std_dev),
            min: self.min.unwrap_or(base.min),
            max: self.max.unwrap_or(base.max),
        }
    }
}

fn chemical_usage_settings<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DistributionSettings, D::Error> {
    Ok(DistributionOverrides::deserialize(deserializer)?.apply(DistributionSettings::chemical_usage()))
}

fn water_pump_usage_settings<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DistributionSettings, D::Error> {
    Ok(DistributionOverrides::deserialize(deserializer)?
        .apply(DistributionSettings::water_pump_usage()))
}

fn water_usage_settings<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DistributionSettings, D::Error> {
    Ok(DistributionOverrides::deserialize(deserializer)?.apply(DistributionSettings::water_usage()))
}

fn default_period() -> u64 {
    900
}

impl Default for DistributionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            due_time_secs: 0,
            period_secs: default_period(),
            mean: 0.0,
            std_dev: 0.0,
            min: 0.0,
            max: f64::MAX,
        }
    }
}

impl DistributionSettings {
    /// Chemical usage: uniform, capped at 5 units per reading
    pub fn chemical_usage() -> Self {
        Self {
            max: 5.0,
            ..Self::default()
        }
    }

    /// Water pump usage: gaussian around 100 with deviation 50
    pub fn water_pump_usage() -> Self {
        Self {
            mean: 100.0,
            std_dev: 50.0,
            ..Self::default()
        }
    }

    /// Water usage: gaussian around 10 with deviation 10
    pub fn water_usage() -> Self {
        Self {
            mean: 10.0,
            std_dev: 10.0,
            ..Self::default()
        }
    }

    pub fn due_time(&self) -> Duration {
        Duration::from_secs(self.due_time_secs)
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn gaussian(&self) -> Distribution {
        Distribution::Gaussian {
            mean: self.mean,
            std_dev: self.std_dev,
            min: self.min,
            max: self.max,
        }
    }

    /// Uniform over `[min, min(max, ceiling)]`, where the ceiling comes from the sampled entity
    pub fn uniform_capped(&self, ceiling: f64) -> Distribution {
        Distribution::Uniform {
            min: self.min,
            max: self.max.min(ceiling).max(self.min),
        }
    }

    /// Check the invariants the generators rely on
    pub fn validate(&self, kind: TelemetryKind) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidDistribution { kind, reason };

        if self.period_secs == 0 {
            return Err(invalid("period_secs must be greater than 0".to_string()));
        }
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(invalid("min and max must be finite".to_string()));
        }
        if self.min > self.max {
            return Err(invalid(format!(
                "min ({}) must not exceed max ({})",
                self.min, self.max
            )));
        }
        if !self.mean.is_finite() {
            return Err(invalid("mean must be finite".to_string()));
        }
        if !self.std_dev.is_finite() || self.std_dev < 0.0 {
            return Err(invalid("std_dev must be finite and non-negative".to_string()));
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid {kind} distribution: {reason}")]
    InvalidDistribution { kind: TelemetryKind, reason: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SimulatorConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SimulatorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.mqtt.broker_url).map_err(|e| {
            ConfigError::InvalidConfig(format!(
                "broker_url '{}' is not a valid URL: {e}",
                self.mqtt.broker_url
            ))
        })?;

        if self.mqtt.reconnect_delay_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "reconnect_delay_secs must be greater than 0".to_string(),
            ));
        }

        for (name, value) in [
            ("chemical_collection", &self.store.chemical_collection),
            ("equipment_collection", &self.store.equipment_collection),
            ("user_collection", &self.store.user_collection),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(format!(
                    "store.{name} must not be empty"
                )));
            }
        }

        for kind in TelemetryKind::ALL {
            self.distribution(kind).validate(kind)?;
        }

        Ok(())
    }

    /// Settings of one telemetry kind
    pub fn distribution(&self, kind: TelemetryKind) -> &DistributionSettings {
        match kind {
            TelemetryKind::ChemicalUsage => &self.chemical_usage,
            TelemetryKind::WaterPumpUsage => &self.water_pump_usage,
            TelemetryKind::WaterUsage => &self.water_usage,
        }
    }

    /// Kinds whose publisher should be started
    pub fn enabled_kinds(&self) -> Vec<TelemetryKind> {
        TelemetryKind::ALL
            .into_iter()
            .filter(|kind| self.distribution(*kind).enabled)
            .collect()
    }

    /// Get MQTT username from environment variable
    pub fn get_mqtt_username(&self) -> Option<String> {
        self.mqtt
            .username_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[mqtt]
broker_url = "mqtt://localhost:1883"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}
