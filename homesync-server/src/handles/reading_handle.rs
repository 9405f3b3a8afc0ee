use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use homesync_api::models::*;

use super::DeviceState;
use crate::errors::ApiError;

pub fn reading_router(device_state: DeviceState) -> Router {
    Router::new()
        .route("/api/devices/:device_id/readings", get(get_readings))
        .route("/api/devices/:device_id/readings/:metric", get(get_reading))
        .with_state(device_state)
}

#[utoipa::path(
    get,
    path = "/api/devices/{device_id}/readings/{metric}",
    tag = "reading",
    params(
        ("device_id" = String, Path, description = "Device ID"),
        ("metric" = Capability, Path, description = "Metric to read")
    ),
    responses(
        (status = 200, description = "Reading with its provenance", body = ReadingResponse),
        (status = 400, description = "Unknown metric, or device does not expose it"),
        (status = 404, description = "Device not found"),
        (status = 503, description = "No live or substitute value available")
    )
)]
pub async fn get_reading(
    State(state): State<DeviceState>,
    path: Result<Path<(String, Capability)>, PathRejection>,
) -> Result<Json<ReadingResponse>, ApiError> {
    let Path((device_id, metric)) = path?;
    let reading = state.hub.reading(&device_id, metric).await?;

    Ok(Json(reading.into_response()))
}

#[utoipa::path(
    get,
    path = "/api/devices/{device_id}/readings",
    tag = "reading",
    params(
        ("device_id" = String, Path, description = "Device ID")
    ),
    responses(
        (status = 200, description = "Every available reading of the device", body = Vec<ReadingResponse>),
        (status = 404, description = "Device not found"),
        (status = 503, description = "No reading available for any metric")
    )
)]
pub async fn get_readings(
    State(state): State<DeviceState>,
    Path(device_id): Path<String>,
) -> Result<Json<Vec<ReadingResponse>>, ApiError> {
    let readings = state.hub.readings(&device_id).await?;

    Ok(Json(readings.into_iter().map(|reading| reading.into_response()).collect()))
}
