use std::collections::{BTreeMap, BTreeSet};

use homesync_api::models::*;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub value: Value,
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    Degraded,
    Recovered,
}

/// A registered device and everything the sync layer knows about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: DeviceId,
    pub class: DeviceClass,
    pub capabilities: BTreeSet<Capability>,
    /// Last value reported per capability, written only through the registry
    pub observed: BTreeMap<Capability, Observation>,
    /// Last value a command successfully applied
    pub desired: BTreeMap<Capability, Value>,
    pub health: Health,
    pub consecutive_failures: u32,
    pub last_success_time: Option<OffsetDateTime>,
    pub last_error: Option<String>,
}

impl Device {
    pub fn new(
        id: impl Into<DeviceId>,
        class: DeviceClass,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        Self {
            id: id.into(),
            class,
            capabilities: capabilities.into_iter().collect(),
            observed: BTreeMap::new(),
            desired: BTreeMap::new(),
            health: Health::Healthy,
            consecutive_failures: 0,
            last_success_time: None,
            last_error: None,
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn observed_value(&self, capability: Capability) -> Option<Value> {
        self.observed.get(&capability).map(|observation| observation.value)
    }

    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            id: self.id.clone(),
            class: self.class,
            capabilities: self.capabilities.iter().copied().collect(),
            health: self.health,
        }
    }

    pub fn detail(&self) -> DeviceDetailResponse {
        DeviceDetailResponse {
            summary: self.summary(),
            observed: self
                .observed
                .iter()
                .map(|(capability, observation)| {
                    (
                        *capability,
                        ObservedValue {
                            value: observation.value,
                            timestamp: observation.timestamp,
                        },
                    )
                })
                .collect(),
            desired: self.desired.clone(),
            consecutive_failures: self.consecutive_failures,
            last_success_time: self.last_success_time,
            last_error: self.last_error.clone(),
        }
    }
}
