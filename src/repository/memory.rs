use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::domain::{Device, SensorReading};

use super::{DeviceRepository, RepositoryError, SensorRepository, day_bounds};

/// Process-local device store. Same contract as the relational backend;
/// used by tests and `STORAGE_BACKEND=memory`.
#[derive(Default)]
pub struct InMemoryDeviceRepository {
    devices: RwLock<Vec<Device>>,
}

impl InMemoryDeviceRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn get(&self, serial_number: &str) -> Result<Option<Device>, RepositoryError> {
        let devices = self.devices.read().await;
        Ok(devices
            .iter()
            .find(|d| d.serial_number == serial_number)
            .cloned())
    }

    async fn get_list(&self, serial_number: &str) -> Result<Vec<Device>, RepositoryError> {
        let devices = self.devices.read().await;
        Ok(devices
            .iter()
            .filter(|d| serial_number.is_empty() || d.serial_number == serial_number)
            .cloned()
            .collect())
    }

    async fn add(&self, device: &Device) -> Result<(), RepositoryError> {
        // Check and insert under one write lock, like a unique index would.
        let mut devices = self.devices.write().await;
        if devices
            .iter()
            .any(|d| d.serial_number == device.serial_number)
        {
            return Err(RepositoryError::Duplicate {
                context: "error while adding device to database",
                key: device.serial_number.clone(),
            });
        }
        devices.push(device.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySensorRepository {
    readings: RwLock<Vec<SensorReading>>,
}

impl InMemorySensorRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SensorRepository for InMemorySensorRepository {
    async fn add_sensor_data(&self, reading: &SensorReading) -> Result<(), RepositoryError> {
        self.readings.write().await.push(reading.clone());
        Ok(())
    }

    async fn get_sensor_data(
        &self,
        serial_number: &str,
        day: NaiveDate,
    ) -> Result<Vec<SensorReading>, RepositoryError> {
        let (start, end) = day_bounds(day);
        let readings = self.readings.read().await;

        let mut matching: Vec<SensorReading> = readings
            .iter()
            .filter(|r| r.device_serial_number == serial_number)
            .filter(|r| r.date >= start && r.date < end)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        matching.sort_by_key(|r| r.date);

        Ok(matching)
    }
}
