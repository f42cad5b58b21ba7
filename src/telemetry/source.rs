//! Per-kind reading production
//!
//! A [`ReadingSource`] runs the first half of a tick: sample the subject entity, draw a value
//! and build the [`Reading`]. `Ok(None)` means "nothing to publish this tick" and is not an
//! error.

use super::{Reading, TelemetryKind};
use crate::config::{DistributionSettings, StoreSection};
use crate::simulation::ValueGenerator;
use crate::store::{Chemical, EntitySampler, Equipment, Filter, StoreError, User};
use async_trait::async_trait;
use tracing::debug;

/// Equipment `Type` of pumps
pub const PUMP_TYPE: &str = "Pump";
/// User `Type` of billed customers
pub const CUSTOMER_TYPE: &str = "Customer";

/// Produces at most one reading per call
#[async_trait]
pub trait ReadingSource: Send {
    fn kind(&self) -> TelemetryKind;

    /// Build the next reading, or `None` when no subject entity is available
    async fn next_reading(&mut self) -> Result<Option<Reading>, StoreError>;
}

/// Active pumps
pub fn pump_filter() -> Filter {
    Filter::all().eq("Type", PUMP_TYPE).eq("IsActive", true)
}

/// Chemicals with stock left above the configured minimum
pub fn chemical_filter(settings: &DistributionSettings) -> Filter {
    Filter::all()
        .gt("Quantity", 0.0)
        .gt("Quantity", settings.min)
}

/// Customer accounts
pub fn customer_filter() -> Filter {
    Filter::all().eq("Type", CUSTOMER_TYPE)
}

/// Chemical dosed into a pump: uniform draw capped by the chemical's remaining stock
pub struct ChemicalUsageSource {
    sampler: EntitySampler,
    generator: ValueGenerator,
    settings: DistributionSettings,
    chemical_collection: String,
    equipment_collection: String,
}

impl ChemicalUsageSource {
    pub fn new(
        sampler: EntitySampler,
        generator: ValueGenerator,
        settings: DistributionSettings,
        store: &StoreSection,
    ) -> Self {
        Self {
            sampler,
            generator,
            settings,
            chemical_collection: store.chemical_collection.clone(),
            equipment_collection: store.equipment_collection.clone(),
        }
    }
}

#[async_trait]
impl ReadingSource for ChemicalUsageSource {
    fn kind(&self) -> TelemetryKind {
        TelemetryKind::ChemicalUsage
    }

    async fn next_reading(&mut self) -> Result<Option<Reading>, StoreError> {
        let chemical: Option<Chemical> = self
            .sampler
            .sample(&self.chemical_collection, &chemical_filter(&self.settings))
            .await?;
        let Some(chemical) = chemical else {
            debug!(collection = %self.chemical_collection, "No chemical in stock");
            return Ok(None);
        };

        let pump: Option<Equipment> = self
            .sampler
            .sample(&self.equipment_collection, &pump_filter())
            .await?;
        let Some(pump) = pump else {
            debug!(collection = %self.equipment_collection, "No active pump");
            return Ok(None);
        };

        let distribution = self.settings.uniform_capped(chemical.quantity);
        let value = self.generator.sample(&distribution);

        Ok(Reading::build_paired(
            self.kind(),
            Some(&chemical.id),
            Some(&pump.id),
            value,
        ))
    }
}

/// Water moved by a pump: clamped gaussian
pub struct WaterPumpUsageSource {
    sampler: EntitySampler,
    generator: ValueGenerator,
    settings: DistributionSettings,
    equipment_collection: String,
}

impl WaterPumpUsageSource {
    pub fn new(
        sampler: EntitySampler,
        generator: ValueGenerator,
        settings: DistributionSettings,
        store: &StoreSection,
    ) -> Self {
        Self {
            sampler,
            generator,
            settings,
            equipment_collection: store.equipment_collection.clone(),
        }
    }
}

#[async_trait]
impl ReadingSource for WaterPumpUsageSource {
    fn kind(&self) -> TelemetryKind {
        TelemetryKind::WaterPumpUsage
    }

    async fn next_reading(&mut self) -> Result<Option<Reading>, StoreError> {
        let pump: Option<Equipment> = self
            .sampler
            .sample(&self.equipment_collection, &pump_filter())
            .await?;

        let value = self.generator.sample(&self.settings.gaussian());
        Ok(Reading::build(
            self.kind(),
            pump.as_ref().map(|p| p.id.as_str()),
            value,
        ))
    }
}

/// Water consumed by a customer: clamped gaussian
pub struct WaterUsageSource {
    sampler: EntitySampler,
    generator: ValueGenerator,
    settings: DistributionSettings,
    user_collection: String,
}

impl WaterUsageSource {
    pub fn new(
        sampler: EntitySampler,
        generator: ValueGenerator,
        settings: DistributionSettings,
        store: &StoreSection,
    ) -> Self {
        Self {
            sampler,
            generator,
            settings,
            user_collection: store.user_collection.clone(),
        }
    }
}

#[async_trait]
impl ReadingSource for WaterUsageSource {
    fn kind(&self) -> TelemetryKind {
        TelemetryKind::WaterUsage
    }

    async fn next_reading(&mut self) -> Result<Option<Reading>, StoreError> {
        let user: Option<User> = self
            .sampler
            .sample(&self.user_collection, &customer_filter())
            .await?;

        let value = self.generator.sample(&self.settings.gaussian());
        Ok(Reading::build(
            self.kind(),
            user.as_ref().map(|u| u.id.as_str()),
            value,
        ))
    }
}

/// Build the source for `kind` over a shared sampler
pub fn source_for(
    kind: TelemetryKind,
    sampler: EntitySampler,
    settings: DistributionSettings,
    store: &StoreSection,
) -> Box<dyn ReadingSource> {
    let generator = ValueGenerator::from_entropy();
    match kind {
        TelemetryKind::ChemicalUsage => Box::new(ChemicalUsageSource::new(
            sampler, generator, settings, store,
        )),
        TelemetryKind::WaterPumpUsage => Box::new(WaterPumpUsageSource::new(
            sampler, generator, settings, store,
        )),
        TelemetryKind::WaterUsage => {
            Box::new(WaterUsageSource::new(sampler, generator, settings, store))
        }
    }
}
