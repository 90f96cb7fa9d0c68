use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sensor_data")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub device_serial_number: String,
    pub date: DateTimeUtc,
    pub temperature: f64,
    pub air_humidity: f64,
    pub carbon_monoxide: f64,
    pub health_status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::domain::SensorReading {
    fn from(m: Model) -> Self {
        Self {
            device_serial_number: m.device_serial_number,
            date: m.date,
            temperature: m.temperature,
            air_humidity: m.air_humidity,
            carbon_monoxide: m.carbon_monoxide,
            health_status: m.health_status,
        }
    }
}
