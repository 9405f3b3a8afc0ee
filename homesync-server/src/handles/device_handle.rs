use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use homesync_api::models::*;

use crate::errors::ApiError;
use crate::services::DeviceHub;

#[derive(Clone)]
pub struct DeviceState {
    pub hub: Arc<DeviceHub>,
}

pub fn device_router(device_state: DeviceState) -> Router {
    Router::new()
        .route("/api/devices", get(get_devices))
        .route("/api/devices/:device_id", get(get_device))
        .with_state(device_state)
}

#[utoipa::path(
    get,
    path = "/api/devices",
    tag = "device",
    params(DeviceListQuery),
    responses(
        (status = 200, description = "Registered devices", body = Vec<DeviceSummary>),
        (status = 400, description = "Unknown device class")
    )
)]
pub async fn get_devices(
    State(state): State<DeviceState>,
    query: Result<Query<DeviceListQuery>, QueryRejection>,
) -> Result<Json<Vec<DeviceSummary>>, ApiError> {
    let Query(query) = query?;

    Ok(Json(state.hub.device_list(query.class).await))
}

#[utoipa::path(
    get,
    path = "/api/devices/{device_id}",
    tag = "device",
    params(
        ("device_id" = String, Path, description = "Device ID")
    ),
    responses(
        (status = 200, description = "Device with its observed state", body = DeviceDetailResponse),
        (status = 404, description = "Device not found")
    )
)]
pub async fn get_device(
    State(state): State<DeviceState>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceDetailResponse>, ApiError> {
    let device = state.hub.device(&device_id).await?;

    Ok(Json(device.detail()))
}
