use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ValidationError, is_unset};

/// A registered device, keyed by its serial number.
///
/// Fields default when absent from a payload so that a missing field is
/// reported by [`Device::validate`] rather than by the JSON decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default, alias = "SerialNumber")]
    pub serial_number: String,
    #[serde(default, alias = "RegistrationDate")]
    pub registration_date: DateTime<Utc>,
    #[serde(default, alias = "FirmwareVersion")]
    pub firmware_version: String,
}

impl Device {
    /// Check the device shape.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule: empty serial number, empty firmware
    /// version, or unset registration date.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.serial_number.is_empty() {
            return Err(ValidationError::EmptySerialNumber);
        }
        if self.firmware_version.is_empty() {
            return Err(ValidationError::EmptyFirmwareVersion);
        }
        if is_unset(&self.registration_date) {
            return Err(ValidationError::MissingRegistrationDate);
        }
        Ok(())
    }
}
