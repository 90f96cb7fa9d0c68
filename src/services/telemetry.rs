//! Use cases for device registration and sensor telemetry.
//!
//! Shape rules live in [`crate::domain`]; cross-aggregate rules (a device is
//! registered once, a reading needs a registered device) are enforced here
//! before anything reaches a repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{Device, SensorReading, ValidationError, parse_reading_date};
use crate::error::{AppError, AppResult};
use crate::repository::{BulkFailure, DeviceRepository, ItemFailure, SensorRepository};

#[derive(Clone)]
pub struct TelemetryService {
    devices: Arc<dyn DeviceRepository>,
    sensors: Arc<dyn SensorRepository>,
}

impl TelemetryService {
    #[must_use]
    pub fn new(devices: Arc<dyn DeviceRepository>, sensors: Arc<dyn SensorRepository>) -> Self {
        Self { devices, sensors }
    }

    /// Register a new device.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed device, `Conflict` if the serial number is
    /// already registered (including a lost concurrent registration),
    /// `Persistence` on storage failure.
    pub async fn register_device(&self, device: Device) -> AppResult<()> {
        device.validate()?;

        if self.devices.get(&device.serial_number).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Device with serial number '{}' already registered",
                device.serial_number
            )));
        }

        self.devices.add(&device).await?;

        tracing::info!(
            serial_number = %device.serial_number,
            firmware_version = %device.firmware_version,
            "Device registered"
        );
        Ok(())
    }

    /// Record one reading for a registered device.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed reading, `NotFound` if the device is not
    /// registered, `Persistence` on storage failure.
    pub async fn record_reading(&self, reading: SensorReading) -> AppResult<()> {
        reading.validate()?;

        if self.devices.get(&reading.device_serial_number).await?.is_none() {
            return Err(device_not_registered(&reading.device_serial_number));
        }

        self.sensors.add_sensor_data(&reading).await?;

        tracing::debug!(serial_number = %reading.device_serial_number, "Sensor reading recorded");
        Ok(())
    }

    /// Record a batch of readings, best effort.
    ///
    /// Each item is checked like a single reading. Rejected items are reported
    /// by index and skipped; accepted items are inserted independently, so one
    /// failure never prevents the others from being stored.
    ///
    /// # Errors
    ///
    /// `PartialFailure` listing every failed index. A failed device lookup
    /// only fails the item it was made for.
    pub async fn record_bulk_readings(&self, readings: Vec<SensorReading>) -> AppResult<()> {
        let total = readings.len();
        let mut failures = Vec::new();
        let mut accepted_indices = Vec::with_capacity(total);
        let mut accepted = Vec::with_capacity(total);
        let mut registered: HashMap<String, bool> = HashMap::new();

        for (index, reading) in readings.into_iter().enumerate() {
            if let Err(e) = reading.validate() {
                failures.push(ItemFailure {
                    index,
                    message: e.to_string(),
                });
                continue;
            }

            let known = match registered.get(&reading.device_serial_number) {
                Some(known) => *known,
                None => match self.devices.get(&reading.device_serial_number).await {
                    Ok(device) => {
                        registered.insert(reading.device_serial_number.clone(), device.is_some());
                        device.is_some()
                    }
                    // Not memoised: a later item for the same device retries the lookup.
                    Err(e) => {
                        failures.push(ItemFailure {
                            index,
                            message: e.to_string(),
                        });
                        continue;
                    }
                },
            };
            if !known {
                failures.push(ItemFailure {
                    index,
                    message: device_not_registered(&reading.device_serial_number).to_string(),
                });
                continue;
            }

            accepted_indices.push(index);
            accepted.push(reading);
        }

        if let Err(bulk) = self.sensors.add_bulk_sensor_data(&accepted).await {
            // Storage reports positions within `accepted`; map back to the request.
            failures.extend(bulk.failures.into_iter().map(|f| ItemFailure {
                index: accepted_indices[f.index],
                message: f.message,
            }));
        }

        tracing::debug!(
            count = total,
            failed = failures.len(),
            "Bulk sensor readings processed"
        );

        BulkFailure::check(failures).map_err(AppError::from)
    }

    /// List registered devices, optionally restricted to one serial number.
    ///
    /// # Errors
    ///
    /// `Persistence` on storage failure.
    pub async fn list_devices(&self, serial_number: Option<&str>) -> AppResult<Vec<Device>> {
        Ok(self
            .devices
            .get_list(serial_number.unwrap_or_default())
            .await?)
    }

    /// Readings of one device on one calendar day (`YYYY-MM-DD`, UTC).
    ///
    /// # Errors
    ///
    /// `Validation` for an empty serial number or a malformed date,
    /// `Persistence` on storage failure.
    pub async fn query_readings(
        &self,
        serial_number: &str,
        date: &str,
    ) -> AppResult<Vec<SensorReading>> {
        if serial_number.is_empty() {
            return Err(ValidationError::EmptyDeviceSerialNumber.into());
        }
        let day = parse_reading_date(date)?;

        Ok(self.sensors.get_sensor_data(serial_number, day).await?)
    }
}

fn device_not_registered(serial_number: &str) -> AppError {
    AppError::NotFound(format!(
        "Device with serial number '{serial_number}' is not registered"
    ))
}
