use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::common::AppState;
use crate::domain::SensorReading;
use crate::error::{AppResult, ErrorResponse};

use super::types::SensorDataQuery;

/// Record one sensor reading
#[utoipa::path(
    post,
    path = "/api/v1/devices/sensors",
    request_body = SensorReading,
    responses(
        (status = 200, description = "Reading recorded"),
        (status = 400, description = "Malformed reading", body = ErrorResponse),
        (status = 404, description = "Device not registered", body = ErrorResponse),
    ),
    tag = "sensors"
)]
pub async fn record_reading(
    State(state): State<AppState>,
    payload: Result<Json<SensorReading>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(reading) = payload?;
    state.telemetry.record_reading(reading).await?;
    Ok(StatusCode::OK)
}

/// Record a batch of sensor readings
///
/// Best effort: every item is attempted. When some items fail, the response
/// lists each failed index while the remaining items stay stored.
#[utoipa::path(
    post,
    path = "/api/v1/devices/sensors/bulk",
    request_body = Vec<SensorReading>,
    responses(
        (status = 200, description = "All readings recorded"),
        (status = 400, description = "Undecodable body", body = ErrorResponse),
        (status = 422, description = "Some readings failed", body = ErrorResponse),
    ),
    tag = "sensors"
)]
pub async fn record_bulk_readings(
    State(state): State<AppState>,
    payload: Result<Json<Vec<SensorReading>>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(readings) = payload?;
    state.telemetry.record_bulk_readings(readings).await?;
    Ok(StatusCode::OK)
}

/// Readings of one device on one day
#[utoipa::path(
    get,
    path = "/api/v1/devices/{serial_number}/sensors",
    params(
        ("serial_number" = String, Path, description = "Device serial number"),
        SensorDataQuery
    ),
    responses(
        (status = 200, description = "Readings retrieved successfully", body = Vec<SensorReading>),
        (status = 400, description = "Missing or malformed date", body = ErrorResponse),
    ),
    tag = "sensors"
)]
pub async fn get_sensor_data(
    State(state): State<AppState>,
    Path(serial_number): Path<String>,
    Query(query): Query<SensorDataQuery>,
) -> AppResult<Json<Vec<SensorReading>>> {
    let readings = state
        .telemetry
        .query_readings(&serial_number, query.date.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(readings))
}
