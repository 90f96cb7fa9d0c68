use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ValidationError, is_unset};

pub const HEALTH_STATUS_MAX_LEN: usize = 150;

/// One periodic observation reported by a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    #[serde(default, alias = "DeviceSerialNumber")]
    pub device_serial_number: String,
    #[serde(default, alias = "Date")]
    pub date: DateTime<Utc>,
    #[serde(default, alias = "Temperature")]
    pub temperature: f64,
    #[serde(default, alias = "AirHumidity")]
    pub air_humidity: f64,
    #[serde(default, alias = "CarbonMonoxide")]
    pub carbon_monoxide: f64,
    #[serde(default, alias = "HealthStatus")]
    pub health_status: String,
}

impl SensorReading {
    /// Check the reading shape. Sensor values are not range-checked.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule: empty device serial number, unset
    /// date, empty health status, or a health status longer than
    /// [`HEALTH_STATUS_MAX_LEN`] characters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.device_serial_number.is_empty() {
            return Err(ValidationError::EmptyDeviceSerialNumber);
        }
        if is_unset(&self.date) {
            return Err(ValidationError::MissingDate);
        }
        if self.health_status.is_empty() {
            return Err(ValidationError::EmptyHealthStatus);
        }
        let len = self.health_status.chars().count();
        if len > HEALTH_STATUS_MAX_LEN {
            return Err(ValidationError::HealthStatusTooLong {
                len,
                max: HEALTH_STATUS_MAX_LEN,
            });
        }
        Ok(())
    }
}

/// Parse a `YYYY-MM-DD` calendar day as used by reading queries.
///
/// # Errors
///
/// Returns `ValidationError::InvalidDate` when the input is not a valid day.
pub fn parse_reading_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}
