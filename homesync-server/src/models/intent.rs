use homesync_api::models::*;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub id: Uuid,
    pub device_id: DeviceId,
    pub capability: Capability,
    pub desired: Value,
    pub submitted_at: OffsetDateTime,
    pub status: IntentStatus,
    pub retry_count: u32,
}

impl Intent {
    pub fn new(device_id: impl Into<DeviceId>, capability: Capability, desired: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id: device_id.into(),
            capability,
            desired,
            submitted_at: OffsetDateTime::now_utc(),
            status: IntentStatus::Pending,
            retry_count: 0,
        }
    }
}

/// Terminal result of a submitted intent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentOutcome {
    pub intent_id: Uuid,
    pub status: IntentStatus,
    pub retry_count: u32,
}

impl IntentOutcome {
    pub fn applied(&self) -> bool {
        self.status == IntentStatus::Applied
    }

    pub fn into_response(self) -> IntentResponse {
        IntentResponse {
            intent_id: self.intent_id,
            accepted: true,
            applied: self.applied(),
            status: self.status,
            retry_count: self.retry_count,
        }
    }
}
