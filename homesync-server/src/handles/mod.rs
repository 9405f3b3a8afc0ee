mod device_handle;
mod intent_handle;
mod reading_handle;
mod sse_handle;

pub use device_handle::*;
pub use intent_handle::*;
pub use reading_handle::*;
pub use sse_handle::*;

use axum::routing::get;
use axum::{Json, Router};
use homesync_api::models::Value as ModelValue;
use homesync_api::models::*;
use serde_json::{Value, json};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        device_handle::get_devices,
        device_handle::get_device,
        reading_handle::get_reading,
        reading_handle::get_readings,
        intent_handle::create_intent,
        sse_handle::sse_handler,
    ),
    components(schemas(
        Capability,
        ModelValue,
        DeviceClass,
        Health,
        Source,
        IntentStatus,
        DeviceSummary,
        ObservedValue,
        DeviceDetailResponse,
        ReadingResponse,
        IntentRequest,
        IntentResponse,
    )),
    tags(
        (name = "device", description = "Device registry"),
        (name = "reading", description = "Sensor and actuator readings"),
        (name = "intent", description = "Control commands"),
        (name = "event", description = "Sync event stream")
    )
)]
pub struct ApiDoc;

pub fn docs_router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api-docs/openapi.json", get(openapi))
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "HomeSync device synchronization API" }))
}

pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
