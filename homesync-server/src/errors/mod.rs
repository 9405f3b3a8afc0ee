pub mod api;
pub mod driver;
pub mod sync;

pub use api::ApiError;
pub use driver::DriverError;
pub use sync::SyncError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_id) = match self {
            ApiError::SyncError(e) => (e.status_code(), e.to_string(), None),
            ApiError::InvalidRequest { status, message } => (status, message, None),
            ApiError::InternalError(e) => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = ?error_id, "Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some(error_id.to_string()),
                )
            }
        };

        let mut error_obj = json!({
            "code": status.as_u16(),
            "message": error_message
        });

        // Internal failures carry an id that matches the server log line
        if let Some(error_id) = error_id {
            error_obj["error_id"] = json!(error_id);
        }

        let body = Json(json!({
            "error": error_obj
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use homesync_api::models::Capability;

    use super::*;

    #[tokio::test]
    async fn test_sync_error_response() {
        let response = ApiError::from(SyncError::SensorUnavailable {
            device_id: "environment".into(),
            metric: Capability::Temperature,
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["error"]["code"], 503);
        assert!(json["error"].get("error_id").is_none());
    }

    #[tokio::test]
    async fn test_invalid_request_response() {
        let response = ApiError::InvalidRequest {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "missing field `value`".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["error"]["code"], 422);
        assert_eq!(json["error"]["message"], "missing field `value`");
    }

    #[tokio::test]
    async fn test_internal_error_carries_error_id() {
        let response = ApiError::from(anyhow::anyhow!("driver table corrupted")).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["error"]["message"], "Internal server error");
        assert!(json["error"]["error_id"].is_string());
    }
}
