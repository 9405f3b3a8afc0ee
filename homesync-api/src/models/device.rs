use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Capability, DeviceId, Value};

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Environmental or presence sensor
    Sensor,
    /// Switchable light
    Light,
    /// Smart plug
    Outlet,
}

impl DeviceClass {
    pub fn is_actuator(&self) -> bool {
        matches!(self, DeviceClass::Light | DeviceClass::Outlet)
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    /// Device answers polls
    Healthy,
    /// Consecutive failures reached the configured threshold
    Degraded,
}

#[cfg_attr(feature = "docs", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "docs", into_params(parameter_in = Query))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceListQuery {
    /// Restrict the listing to one device class
    pub class: Option<DeviceClass>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSummary {
    /// Device identifier
    pub id: DeviceId,
    /// Device class
    pub class: DeviceClass,
    /// Declared capabilities
    pub capabilities: Vec<Capability>,
    /// Current health
    pub health: Health,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedValue {
    /// Last value reported by the device
    pub value: Value,
    /// Time the value was observed
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDetailResponse {
    #[serde(flatten)]
    pub summary: DeviceSummary,
    /// Observed state per capability
    pub observed: BTreeMap<Capability, ObservedValue>,
    /// Last value successfully applied per writable capability
    pub desired: BTreeMap<Capability, Value>,
    /// Failed polls since the last success
    pub consecutive_failures: u32,
    /// Time of the last successful poll
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_success_time: Option<OffsetDateTime>,
    /// Most recent driver error
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_detail_flattens_summary() {
        let detail = DeviceDetailResponse {
            summary: DeviceSummary {
                id: "main_outlet".into(),
                class: DeviceClass::Outlet,
                capabilities: vec![Capability::OnOff],
                health: Health::Healthy,
            },
            observed: BTreeMap::new(),
            desired: BTreeMap::from([(Capability::OnOff, Value::Bool(true))]),
            consecutive_failures: 0,
            last_success_time: None,
            last_error: None,
        };

        let json = serde_json::to_value(&detail).unwrap();

        assert_eq!(json["id"], "main_outlet");
        assert_eq!(json["class"], "outlet");
        assert_eq!(json["health"], "healthy");
        assert_eq!(json["desired"]["on_off"], true);
        assert!(json["last_success_time"].is_null());
    }
}
