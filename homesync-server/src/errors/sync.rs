use axum::http::StatusCode;
use homesync_api::models::{Capability, DeviceId, ValueKind};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error("Unknown device: {0}")]
    UnknownDevice(DeviceId),

    #[error("Device {device_id} does not support {capability}")]
    UnsupportedCapability {
        device_id: DeviceId,
        capability: Capability,
    },

    #[error("Device already registered: {0}")]
    DuplicateDevice(DeviceId),

    #[error("Invalid value for {capability}, expected {expected}")]
    InvalidValue {
        capability: Capability,
        expected: ValueKind,
    },

    #[error("No reading cached for {device_id}/{metric}")]
    NotFound { device_id: DeviceId, metric: Capability },

    #[error("Sensor unavailable: {device_id}/{metric}")]
    SensorUnavailable { device_id: DeviceId, metric: Capability },
}

impl SyncError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SyncError::UnknownDevice(_) => StatusCode::NOT_FOUND,
            SyncError::UnsupportedCapability { .. } => StatusCode::BAD_REQUEST,
            SyncError::DuplicateDevice(_) => StatusCode::CONFLICT,
            SyncError::InvalidValue { .. } => StatusCode::BAD_REQUEST,
            SyncError::NotFound { .. } => StatusCode::NOT_FOUND,
            SyncError::SensorUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
