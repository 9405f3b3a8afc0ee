use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use homesync_api::models::*;

use super::DeviceState;
use crate::errors::ApiError;

pub fn intent_router(device_state: DeviceState) -> Router {
    Router::new()
        .route("/api/devices/:device_id/intents", post(create_intent))
        .with_state(device_state)
}

#[utoipa::path(
    post,
    path = "/api/devices/{device_id}/intents",
    tag = "intent",
    params(
        ("device_id" = String, Path, description = "Device ID")
    ),
    request_body = IntentRequest,
    responses(
        (status = 200, description = "Intent reached a terminal status", body = IntentResponse),
        (status = 400, description = "Capability not writable or value of the wrong kind"),
        (status = 404, description = "Device not found"),
        (status = 422, description = "Body is not an intent request")
    )
)]
pub async fn create_intent(
    State(state): State<DeviceState>,
    Path(device_id): Path<String>,
    body: Result<Json<IntentRequest>, JsonRejection>,
) -> Result<Json<IntentResponse>, ApiError> {
    let Json(body) = body?;
    let outcome = state
        .hub
        .submit_intent(&device_id, body.capability, body.value)
        .await?;

    Ok(Json(outcome.into_response()))
}
