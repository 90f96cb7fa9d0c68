use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ========== DEVICES ==========
        // Serial numbers and firmware versions have no length limit.
        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Devices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Devices::SerialNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Devices::RegistrationDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Devices::FirmwareVersion)
                            .string()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ========== SENSOR DATA ==========
        // No foreign key to devices: existence is checked before insert.
        manager
            .create_table(
                Table::create()
                    .table(SensorData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SensorData::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SensorData::DeviceSerialNumber)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SensorData::Date)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SensorData::Temperature).double().not_null())
                    .col(ColumnDef::new(SensorData::AirHumidity).double().not_null())
                    .col(ColumnDef::new(SensorData::CarbonMonoxide).double().not_null())
                    .col(
                        ColumnDef::new(SensorData::HealthStatus)
                            .string_len(150)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sensor_data_device_date")
                    .table(SensorData::Table)
                    .col(SensorData::DeviceSerialNumber)
                    .col(SensorData::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SensorData::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Devices::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Devices {
    Table,
    Id,
    SerialNumber,
    RegistrationDate,
    FirmwareVersion,
}

#[derive(DeriveIden)]
enum SensorData {
    Table,
    Id,
    DeviceSerialNumber,
    Date,
    Temperature,
    AirHumidity,
    CarbonMonoxide,
    HealthStatus,
}
