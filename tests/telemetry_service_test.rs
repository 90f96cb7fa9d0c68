//! Use-case tests over the in-memory backend.
//!
//! Run with: cargo test --test telemetry_service_test

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use device_telemetry::domain::{Device, SensorReading, ValidationError};
use device_telemetry::error::AppError;
use device_telemetry::repository::{
    BulkFailure, DeviceRepository, InMemoryDeviceRepository, InMemorySensorRepository,
    ItemFailure, RepositoryError, SensorRepository,
};
use device_telemetry::services::TelemetryService;

fn service() -> (TelemetryService, Arc<InMemorySensorRepository>) {
    let sensors = Arc::new(InMemorySensorRepository::new());
    let service = TelemetryService::new(Arc::new(InMemoryDeviceRepository::new()), sensors.clone());
    (service, sensors)
}

fn device(serial: &str) -> Device {
    Device {
        serial_number: serial.to_string(),
        registration_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        firmware_version: "1.0".to_string(),
    }
}

fn reading(serial: &str, hour: u32) -> SensorReading {
    SensorReading {
        device_serial_number: serial.to_string(),
        date: Utc.with_ymd_and_hms(2024, 1, 2, hour, 0, 0).unwrap(),
        temperature: 21.5,
        air_humidity: 40.0,
        carbon_monoxide: 0.2,
        health_status: "ok".to_string(),
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

#[tokio::test]
async fn registering_twice_conflicts() {
    let (service, _) = service();

    service.register_device(device("SN-1")).await.unwrap();
    let err = service.register_device(device("SN-1")).await.unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
    assert_eq!(service.list_devices(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_device_is_not_stored() {
    let (service, _) = service();
    let mut d = device("SN-1");
    d.firmware_version.clear();

    let err = service.register_device(d).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::Validation(ValidationError::EmptyFirmwareVersion)
    ));
    assert!(service.list_devices(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn reading_requires_registered_device() {
    let (service, _) = service();

    let err = service.record_reading(reading("SN-1", 8)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");

    service.register_device(device("SN-1")).await.unwrap();
    service.record_reading(reading("SN-1", 8)).await.unwrap();

    let stored = service.query_readings("SN-1", "2024-01-02").await.unwrap();
    assert_eq!(stored, vec![reading("SN-1", 8)]);
}

#[tokio::test]
async fn malformed_reading_is_rejected_before_lookup() {
    let (service, _) = service();
    let mut r = reading("SN-1", 8);
    r.health_status = "x".repeat(151);

    let err = service.record_reading(r).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::HealthStatusTooLong { .. })
    ));
}

#[tokio::test]
async fn bulk_stores_valid_items_and_names_failed_indices() {
    let (service, sensors) = service();
    service.register_device(device("SN-1")).await.unwrap();

    let mut invalid = reading("SN-1", 9);
    invalid.health_status.clear();
    let batch = vec![
        reading("SN-1", 8),
        invalid,
        reading("SN-1", 10),
        reading("SN-404", 11),
        reading("SN-1", 12),
    ];

    let err = service.record_bulk_readings(batch).await.unwrap_err();
    let AppError::PartialFailure(bulk) = err else {
        panic!("expected partial failure");
    };
    assert_eq!(bulk.failed_indices(), vec![1, 3]);
    assert!(bulk.to_string().contains("#1"));
    assert!(bulk.to_string().contains("#3"));

    let stored = sensors.get_sensor_data("SN-1", day(2)).await.unwrap();
    let hours: Vec<u32> = stored
        .iter()
        .map(|r| chrono::Timelike::hour(&r.date))
        .collect();
    assert_eq!(hours, vec![8, 10, 12]);
}

#[tokio::test]
async fn bulk_with_only_valid_items_succeeds() {
    let (service, _) = service();
    service.register_device(device("SN-1")).await.unwrap();
    service.register_device(device("SN-2")).await.unwrap();

    service
        .record_bulk_readings(vec![reading("SN-1", 8), reading("SN-2", 9)])
        .await
        .unwrap();

    assert_eq!(service.query_readings("SN-1", "2024-01-02").await.unwrap().len(), 1);
    assert_eq!(service.query_readings("SN-2", "2024-01-02").await.unwrap().len(), 1);
}

#[tokio::test]
async fn empty_bulk_is_a_no_op() {
    let (service, _) = service();
    service.record_bulk_readings(Vec::new()).await.unwrap();
}

/// Storage that refuses readings with a given health status.
struct FlakySensorRepository {
    inner: InMemorySensorRepository,
    poison: &'static str,
}

#[async_trait]
impl SensorRepository for FlakySensorRepository {
    async fn add_sensor_data(&self, reading: &SensorReading) -> Result<(), RepositoryError> {
        if reading.health_status == self.poison {
            return Err(RepositoryError::Database {
                context: "error while adding device sensor data to database",
                source: sea_orm::DbErr::Custom("disk full".to_string()),
            });
        }
        self.inner.add_sensor_data(reading).await
    }

    async fn get_sensor_data(
        &self,
        serial_number: &str,
        day: NaiveDate,
    ) -> Result<Vec<SensorReading>, RepositoryError> {
        self.inner.get_sensor_data(serial_number, day).await
    }
}

#[tokio::test]
async fn bulk_storage_failures_keep_request_indices() {
    let sensors = Arc::new(FlakySensorRepository {
        inner: InMemorySensorRepository::new(),
        poison: "boom",
    });
    let service = TelemetryService::new(Arc::new(InMemoryDeviceRepository::new()), sensors.clone());
    service.register_device(device("SN-1")).await.unwrap();

    let mut invalid = reading("SN-1", 8);
    invalid.device_serial_number.clear();
    let mut poisoned = reading("SN-1", 10);
    poisoned.health_status = "boom".to_string();

    // index 0 rejected by validation, index 2 by storage
    let err = service
        .record_bulk_readings(vec![invalid, reading("SN-1", 9), poisoned, reading("SN-1", 11)])
        .await
        .unwrap_err();

    let AppError::PartialFailure(bulk) = err else {
        panic!("expected partial failure");
    };
    assert_eq!(bulk.failed_indices(), vec![0, 2]);
    assert!(bulk.failures[1].message.contains("disk full"));
    assert_eq!(sensors.get_sensor_data("SN-1", day(2)).await.unwrap().len(), 2);
}

/// Device store whose lookups for one serial number fail a set number of times.
struct FlakyDeviceRepository {
    inner: InMemoryDeviceRepository,
    flaky_serial: &'static str,
    outages: AtomicUsize,
}

#[async_trait]
impl DeviceRepository for FlakyDeviceRepository {
    async fn get(&self, serial_number: &str) -> Result<Option<Device>, RepositoryError> {
        if serial_number == self.flaky_serial
            && self
                .outages
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(RepositoryError::Database {
                context: "error while getting device from database",
                source: sea_orm::DbErr::Custom("connection reset".to_string()),
            });
        }
        self.inner.get(serial_number).await
    }

    async fn get_list(&self, serial_number: &str) -> Result<Vec<Device>, RepositoryError> {
        self.inner.get_list(serial_number).await
    }

    async fn add(&self, device: &Device) -> Result<(), RepositoryError> {
        self.inner.add(device).await
    }
}

#[tokio::test]
async fn bulk_device_lookup_failure_only_fails_its_item() {
    let devices = FlakyDeviceRepository {
        inner: InMemoryDeviceRepository::new(),
        flaky_serial: "SN-2",
        outages: AtomicUsize::new(1),
    };
    devices.add(&device("SN-1")).await.unwrap();
    devices.add(&device("SN-2")).await.unwrap();
    let sensors = Arc::new(InMemorySensorRepository::new());
    let service = TelemetryService::new(Arc::new(devices), sensors.clone());

    let err = service
        .record_bulk_readings(vec![
            reading("SN-1", 8),
            reading("SN-2", 9),
            reading("SN-1", 10),
            reading("SN-2", 11),
        ])
        .await
        .unwrap_err();

    let AppError::PartialFailure(bulk) = err else {
        panic!("expected partial failure");
    };
    assert_eq!(bulk.failed_indices(), vec![1]);
    assert!(bulk.failures[0].message.contains("connection reset"));

    // the failed lookup is retried for the next SN-2 item
    assert_eq!(sensors.get_sensor_data("SN-1", day(2)).await.unwrap().len(), 2);
    assert_eq!(
        sensors.get_sensor_data("SN-2", day(2)).await.unwrap(),
        vec![reading("SN-2", 11)]
    );
}

#[test]
fn bulk_failure_message_joins_items_in_index_order() {
    let err = BulkFailure::check(vec![
        ItemFailure {
            index: 3,
            message: "device not registered".to_string(),
        },
        ItemFailure {
            index: 1,
            message: "health status must be set".to_string(),
        },
    ])
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "error while adding sensor value #1 from bulk: health status must be set; \
         error while adding sensor value #3 from bulk: device not registered"
    );
    assert!(BulkFailure::check(Vec::new()).is_ok());
}

#[tokio::test]
async fn list_devices_filters_by_exact_serial() {
    let (service, _) = service();
    service.register_device(device("SN-1")).await.unwrap();
    service.register_device(device("SN-2")).await.unwrap();

    let all = service.list_devices(None).await.unwrap();
    assert_eq!(
        all.iter().map(|d| d.serial_number.as_str()).collect::<Vec<_>>(),
        vec!["SN-1", "SN-2"]
    );
    assert_eq!(service.list_devices(Some("")).await.unwrap().len(), 2);

    let one = service.list_devices(Some("SN-2")).await.unwrap();
    assert_eq!(one, vec![device("SN-2")]);

    assert!(service.list_devices(Some("SN-")).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_devices_does_not_trim_the_filter() {
    let (service, _) = service();
    service.register_device(device("SN-1")).await.unwrap();

    assert!(service.list_devices(Some("   ")).await.unwrap().is_empty());
    assert!(service.list_devices(Some(" SN-1 ")).await.unwrap().is_empty());
    assert_eq!(service.list_devices(Some("SN-1")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn query_readings_matches_calendar_day_only() {
    let (service, _) = service();
    service.register_device(device("SN-1")).await.unwrap();

    let mut late = reading("SN-1", 23);
    late.date = Utc.with_ymd_and_hms(2024, 1, 2, 23, 59, 59).unwrap();
    let mut next_day = reading("SN-1", 0);
    next_day.date = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
    let mut prev_day = reading("SN-1", 0);
    prev_day.date = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap();

    for r in [reading("SN-1", 0), late.clone(), next_day, prev_day] {
        service.record_reading(r).await.unwrap();
    }

    let stored = service.query_readings("SN-1", "2024-01-02").await.unwrap();
    assert_eq!(stored, vec![reading("SN-1", 0), late]);
}

#[tokio::test]
async fn query_readings_validates_input() {
    let (service, _) = service();

    let err = service.query_readings("SN-1", "2024/01/02").await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::InvalidDate(_))
    ));

    let err = service.query_readings("", "2024-01-02").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Unknown device is an empty result, not an error
    assert!(service.query_readings("SN-9", "2024-01-02").await.unwrap().is_empty());
}

/// Device store whose lookup never sees the existing row, so the unique
/// index is the only thing standing between two registrations.
struct RacyDeviceRepository(InMemoryDeviceRepository);

#[async_trait]
impl DeviceRepository for RacyDeviceRepository {
    async fn get(&self, _serial_number: &str) -> Result<Option<Device>, RepositoryError> {
        Ok(None)
    }

    async fn get_list(&self, serial_number: &str) -> Result<Vec<Device>, RepositoryError> {
        self.0.get_list(serial_number).await
    }

    async fn add(&self, device: &Device) -> Result<(), RepositoryError> {
        self.0.add(device).await
    }
}

#[tokio::test]
async fn losing_a_registration_race_is_a_conflict() {
    let service = TelemetryService::new(
        Arc::new(RacyDeviceRepository(InMemoryDeviceRepository::new())),
        Arc::new(InMemorySensorRepository::new()),
    );

    service.register_device(device("SN-1")).await.unwrap();
    let err = service.register_device(device("SN-1")).await.unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
}
