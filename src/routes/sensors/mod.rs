mod handlers;
mod types;

pub use handlers::{get_sensor_data, record_bulk_readings, record_reading};
pub use types::SensorDataQuery;

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{__path_get_sensor_data, __path_record_bulk_readings, __path_record_reading};
