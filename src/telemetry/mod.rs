//! Telemetry kinds, readings and the sources that produce them

pub mod kind;
pub mod reading;
pub mod source;

pub use kind::TelemetryKind;
pub use reading::{ChemicalUsagePayload, Reading, SensorData, SensorReadingPayload};
pub use source::{
    source_for, ChemicalUsageSource, ReadingSource, WaterPumpUsageSource, WaterUsageSource,
};
