use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SensorDataQuery {
    /// Calendar day (UTC) in `YYYY-MM-DD` format
    pub date: Option<String>,
}
