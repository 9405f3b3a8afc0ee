mod bridge;
mod simulated;

pub use bridge::BridgeDriver;
pub use simulated::SimulatedDriver;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use homesync_api::models::{Capability, DeviceId, Value};
use serde::{Deserialize, Serialize};

use crate::errors::DriverError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub metric: Capability,
    pub value: Value,
}

impl MetricReading {
    pub fn new(metric: Capability, value: impl Into<Value>) -> Self {
        Self {
            metric,
            value: value.into(),
        }
    }
}

/// Vendor seam between the sync layer and physical devices.
///
/// Sensor drivers only implement `read`; the default `write` rejects the call.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn read(&self, device_id: &str) -> Result<Vec<MetricReading>, DriverError>;

    async fn write(
        &self,
        _device_id: &str,
        _capability: Capability,
        _value: Value,
    ) -> Result<(), DriverError> {
        Err(DriverError::Unsupported {
            driver: self.name(),
            operation: "write",
        })
    }
}

/// Device id to driver lookup, fixed after startup.
#[derive(Clone, Default)]
pub struct DriverBindings {
    drivers: HashMap<DeviceId, Arc<dyn DeviceDriver>>,
}

impl DriverBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, device_id: impl Into<DeviceId>, driver: Arc<dyn DeviceDriver>) {
        self.drivers.insert(device_id.into(), driver);
    }

    pub fn get(&self, device_id: &str) -> Option<Arc<dyn DeviceDriver>> {
        self.drivers.get(device_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}
