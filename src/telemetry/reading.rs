//! Sensor readings and their wire payloads
//!
//! A [`Reading`] is built fresh on every tick and never mutated. Serialization produces the
//! flat PascalCase JSON consumed downstream:
//!
//! - chemical usage: `{"ChemicalId": .., "EquipmentId": .., "Data": {"Timestamp": .., "Value": ..}}`
//! - pump and water usage: `{"Id": .., "Data": {"Timestamp": .., "Value": ..}}`

use super::TelemetryKind;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Immutable sensor reading
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub kind: TelemetryKind,
    pub subject_id: String,
    /// Second entity for readings that reference two (equipment paired with a chemical)
    pub secondary_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Reading {
    /// Build a single-subject reading stamped with the current UTC time.
    ///
    /// Returns `None` (skip the tick) if the subject is missing or the value is not finite.
    pub fn build(kind: TelemetryKind, subject_id: Option<&str>, value: f64) -> Option<Self> {
        Self::build_at(kind, subject_id, None, value, Utc::now())
    }

    /// Build a reading referencing two entities; both must be present
    pub fn build_paired(
        kind: TelemetryKind,
        subject_id: Option<&str>,
        secondary_id: Option<&str>,
        value: f64,
    ) -> Option<Self> {
        let secondary_id = secondary_id?;
        Self::build_at(kind, subject_id, Some(secondary_id), value, Utc::now())
    }

    /// Pure builder with an explicit timestamp
    pub fn build_at(
        kind: TelemetryKind,
        subject_id: Option<&str>,
        secondary_id: Option<&str>,
        value: f64,
        timestamp: DateTime<Utc>,
    ) -> Option<Self> {
        let subject_id = subject_id?;
        if !value.is_finite() {
            return None;
        }

        Some(Self {
            kind,
            subject_id: subject_id.to_string(),
            secondary_id: secondary_id.map(str::to_string),
            timestamp,
            value,
        })
    }

    /// Broker topic this reading belongs on
    pub fn topic(&self) -> &'static str {
        self.kind.topic()
    }

    /// Serialize to the kind-specific JSON payload
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        let data = SensorData {
            timestamp: self.timestamp,
            value: self.value,
        };

        match (self.kind, &self.secondary_id) {
            (TelemetryKind::ChemicalUsage, Some(equipment_id)) => {
                serde_json::to_vec(&ChemicalUsagePayload {
                    chemical_id: self.subject_id.clone(),
                    equipment_id: equipment_id.clone(),
                    data,
                })
            }
            _ => serde_json::to_vec(&SensorReadingPayload {
                id: self.subject_id.clone(),
                data,
            }),
        }
    }
}

/// Timestamped measurement shared by every payload shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SensorData {
    #[serde(serialize_with = "serialize_utc")]
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Pump and water usage payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SensorReadingPayload {
    pub id: String,
    pub data: SensorData,
}

/// Chemical usage payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChemicalUsagePayload {
    pub chemical_id: String,
    pub equipment_id: String,
    pub data: SensorData,
}

/// ISO-8601 UTC with a trailing `Z`
fn serialize_utc<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}
