use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub serial_number: String,
    pub registration_date: DateTimeUtc,
    pub firmware_version: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::domain::Device {
    fn from(m: Model) -> Self {
        Self {
            serial_number: m.serial_number,
            registration_date: m.registration_date,
            firmware_version: m.firmware_version,
        }
    }
}
