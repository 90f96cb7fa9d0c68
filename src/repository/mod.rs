//! Persistence contracts for devices and sensor readings.
//!
//! Backends guarantee per-call atomicity only. A bulk insert is a sequence of
//! independent single-row inserts; there is no transaction spanning items.

pub mod memory;
pub mod relational;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Device, SensorReading};

pub use memory::{InMemoryDeviceRepository, InMemorySensorRepository};
pub use relational::{SeaOrmDeviceRepository, SeaOrmSensorRepository};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{context}: key '{key}' already exists")]
    Duplicate { context: &'static str, key: String },

    #[error("{context}: {source}")]
    Database {
        context: &'static str,
        #[source]
        source: sea_orm::DbErr,
    },
}

/// One failed item of a bulk insert, by position in the submitted sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ItemFailure {
    pub index: usize,
    pub message: String,
}

/// Aggregate error of a best-effort bulk insert. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_failures(.failures))]
pub struct BulkFailure {
    pub failures: Vec<ItemFailure>,
}

impl BulkFailure {
    /// `Ok(())` when nothing failed, otherwise the failures sorted by index.
    ///
    /// # Errors
    ///
    /// Returns `BulkFailure` if `failures` is not empty.
    pub fn check(mut failures: Vec<ItemFailure>) -> Result<(), Self> {
        if failures.is_empty() {
            return Ok(());
        }
        failures.sort_by_key(|f| f.index);
        Err(Self { failures })
    }

    #[must_use]
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }
}

fn join_failures(failures: &[ItemFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("error while adding sensor value #{} from bulk: {}", f.index, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Look up a device. A missing device is `Ok(None)`, not an error.
    async fn get(&self, serial_number: &str) -> Result<Option<Device>, RepositoryError>;

    /// All devices in insertion order when `serial_number` is empty,
    /// otherwise the exact match (zero or one device).
    async fn get_list(&self, serial_number: &str) -> Result<Vec<Device>, RepositoryError>;

    /// Insert a new device. A taken serial number yields
    /// `RepositoryError::Duplicate`.
    async fn add(&self, device: &Device) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SensorRepository: Send + Sync {
    async fn add_sensor_data(&self, reading: &SensorReading) -> Result<(), RepositoryError>;

    /// Insert every reading independently. A failing item never stops the
    /// remaining ones; all failures are reported together by index.
    async fn add_bulk_sensor_data(&self, readings: &[SensorReading]) -> Result<(), BulkFailure> {
        let mut failures = Vec::new();
        for (index, reading) in readings.iter().enumerate() {
            if let Err(e) = self.add_sensor_data(reading).await {
                failures.push(ItemFailure {
                    index,
                    message: e.to_string(),
                });
            }
        }
        BulkFailure::check(failures)
    }

    /// Readings of one device whose timestamp falls on `day` (UTC),
    /// ordered by timestamp.
    async fn get_sensor_data(
        &self,
        serial_number: &str,
        day: NaiveDate,
    ) -> Result<Vec<SensorReading>, RepositoryError>;
}

/// Half-open UTC range `[day 00:00, next day 00:00)` covering one calendar day.
pub(crate) fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}
