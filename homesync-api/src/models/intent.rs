use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Capability, Value};

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    /// Waiting for its turn on the device
    Pending,
    /// Device acknowledged the value
    Applied,
    /// Every attempt failed
    Failed,
    /// Replaced by a newer intent for the same device
    Superseded,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRequest {
    /// Capability to change
    pub capability: Capability,
    /// Desired value
    pub value: Value,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResponse {
    /// Intent identifier
    pub intent_id: Uuid,
    /// Whether the intent passed validation
    pub accepted: bool,
    /// Whether the device now holds the desired value
    pub applied: bool,
    /// Final status
    pub status: IntentStatus,
    /// Attempts made beyond the first
    pub retry_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_request_from_json() {
        let request: IntentRequest =
            serde_json::from_str(r#"{"capability":"on_off","value":true}"#).unwrap();

        assert_eq!(request.capability, Capability::OnOff);
        assert_eq!(request.value, Value::Bool(true));
    }
}
