use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct DevicesQuery {
    /// Exact serial number; omit or leave empty to list every device
    pub serial_number: Option<String>,
}
