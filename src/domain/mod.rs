//! Device and sensor-reading value types with their shape rules.
//!
//! Validation here is pure: no I/O, no logging. Callers must run
//! `validate()` before handing a value to a repository.

mod device;
mod reading;

pub use device::Device;
pub use reading::{HEALTH_STATUS_MAX_LEN, SensorReading, parse_reading_date};

use chrono::{DateTime, Datelike, Utc};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("serial number must not be empty")]
    EmptySerialNumber,

    #[error("firmware version must not be empty")]
    EmptyFirmwareVersion,

    #[error("registration date must be set")]
    MissingRegistrationDate,

    #[error("device serial number must not be empty")]
    EmptyDeviceSerialNumber,

    #[error("reading date must be set")]
    MissingDate,

    #[error("health status must not be empty")]
    EmptyHealthStatus,

    #[error("health status must be at most {max} characters, got {len}")]
    HealthStatusTooLong { len: usize, max: usize },

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// A timestamp counts as unset when it is the serde default (Unix epoch)
/// or the zero value older clients send (`0001-01-01T00:00:00Z`).
pub(crate) fn is_unset(ts: &DateTime<Utc>) -> bool {
    *ts == DateTime::<Utc>::default() || ts.year() <= 1
}
