use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, SqlErr,
};

use crate::domain::{Device, SensorReading};
use crate::entity::{devices, sensor_data};

use super::{DeviceRepository, RepositoryError, SensorRepository, day_bounds};

/// Devices stored in the `devices` table.
///
/// The connection is a pooled handle opened once at startup and shared by
/// every request; cloning it is cheap.
#[derive(Clone)]
pub struct SeaOrmDeviceRepository {
    db: DatabaseConnection,
}

impl SeaOrmDeviceRepository {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn wrap(context: &'static str) -> impl FnOnce(DbErr) -> RepositoryError {
    move |source| RepositoryError::Database { context, source }
}

#[async_trait]
impl DeviceRepository for SeaOrmDeviceRepository {
    async fn get(&self, serial_number: &str) -> Result<Option<Device>, RepositoryError> {
        let row = devices::Entity::find()
            .filter(devices::Column::SerialNumber.eq(serial_number))
            .one(&self.db)
            .await
            .map_err(wrap("error while getting device by serial number"))?;

        Ok(row.map(Device::from))
    }

    async fn get_list(&self, serial_number: &str) -> Result<Vec<Device>, RepositoryError> {
        let mut query = devices::Entity::find();
        if !serial_number.is_empty() {
            query = query.filter(devices::Column::SerialNumber.eq(serial_number));
        }

        let rows = query
            .order_by_asc(devices::Column::Id)
            .all(&self.db)
            .await
            .map_err(wrap("error while getting list of devices"))?;

        Ok(rows.into_iter().map(Device::from).collect())
    }

    async fn add(&self, device: &Device) -> Result<(), RepositoryError> {
        const CONTEXT: &str = "error while adding device to database";

        let model = devices::ActiveModel {
            id: NotSet,
            serial_number: Set(device.serial_number.clone()),
            registration_date: Set(device.registration_date),
            firmware_version: Set(device.firmware_version.clone()),
        };

        match devices::Entity::insert(model).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(RepositoryError::Duplicate {
                    context: CONTEXT,
                    key: device.serial_number.clone(),
                })
            }
            Err(source) => Err(RepositoryError::Database {
                context: CONTEXT,
                source,
            }),
        }
    }
}

/// Readings stored in the `sensor_data` table.
#[derive(Clone)]
pub struct SeaOrmSensorRepository {
    db: DatabaseConnection,
}

impl SeaOrmSensorRepository {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SensorRepository for SeaOrmSensorRepository {
    async fn add_sensor_data(&self, reading: &SensorReading) -> Result<(), RepositoryError> {
        let model = sensor_data::ActiveModel {
            id: NotSet,
            device_serial_number: Set(reading.device_serial_number.clone()),
            date: Set(reading.date),
            temperature: Set(reading.temperature),
            air_humidity: Set(reading.air_humidity),
            carbon_monoxide: Set(reading.carbon_monoxide),
            health_status: Set(reading.health_status.clone()),
        };

        sensor_data::Entity::insert(model)
            .exec(&self.db)
            .await
            .map_err(wrap("error while adding device sensor data to database"))?;

        Ok(())
    }

    async fn get_sensor_data(
        &self,
        serial_number: &str,
        day: NaiveDate,
    ) -> Result<Vec<SensorReading>, RepositoryError> {
        let (start, end) = day_bounds(day);

        let rows = sensor_data::Entity::find()
            .filter(sensor_data::Column::DeviceSerialNumber.eq(serial_number))
            .filter(sensor_data::Column::Date.gte(start))
            .filter(sensor_data::Column::Date.lt(end))
            .order_by_asc(sensor_data::Column::Date)
            .order_by_asc(sensor_data::Column::Id)
            .all(&self.db)
            .await
            .map_err(wrap("error while getting sensor data for device"))?;

        Ok(rows.into_iter().map(SensorReading::from).collect())
    }
}
