use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};

use crate::common::AppState;
use crate::domain::Device;
use crate::error::{AppResult, ErrorResponse};

use super::types::DevicesQuery;

/// Register a device
#[utoipa::path(
    post,
    path = "/api/v1/devices",
    request_body = Device,
    responses(
        (status = 200, description = "Device registered"),
        (status = 400, description = "Malformed device", body = ErrorResponse),
        (status = 409, description = "Serial number already registered", body = ErrorResponse),
    ),
    tag = "devices"
)]
pub async fn register_device(
    State(state): State<AppState>,
    payload: Result<Json<Device>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(device) = payload?;
    state.telemetry.register_device(device).await?;
    Ok(StatusCode::OK)
}

/// List registered devices
#[utoipa::path(
    get,
    path = "/api/v1/devices",
    params(DevicesQuery),
    responses(
        (status = 200, description = "Devices retrieved successfully", body = Vec<Device>),
    ),
    tag = "devices"
)]
pub async fn list_devices(
    State(state): State<AppState>,
    Query(query): Query<DevicesQuery>,
) -> AppResult<Json<Vec<Device>>> {
    let devices = state
        .telemetry
        .list_devices(query.serial_number.as_deref())
        .await?;

    Ok(Json(devices))
}
