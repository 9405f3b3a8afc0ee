use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use homesync_api::models::*;
use tokio::sync::{Mutex, Semaphore};

use crate::drivers::{DeviceDriver, MetricReading};
use crate::errors::DriverError;
use crate::models::Device;
use crate::services::{DeviceHub, DispatcherConfig, PollerConfig, RangeMockGenerator, StalenessPolicy};

/// Driver with scripted readings, failure injection and call counting.
#[derive(Default)]
pub struct ScriptedDriver {
    readings: Mutex<HashMap<DeviceId, BTreeMap<Capability, Value>>>,
    read_failures: Mutex<HashMap<DeviceId, u32>>,
    write_failures: Mutex<HashMap<DeviceId, u32>>,
    read_delay: Mutex<Option<Duration>>,
    reads: Mutex<HashMap<DeviceId, usize>>,
    writes: Mutex<HashMap<DeviceId, usize>>,
    write_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_reading(&self, device_id: &str, metric: Capability, value: impl Into<Value>) {
        self.readings
            .lock()
            .await
            .entry(device_id.to_string())
            .or_default()
            .insert(metric, value.into());
    }

    /// Fails the next `count` reads of the device.
    pub async fn fail_reads(&self, device_id: &str, count: u32) {
        self.read_failures.lock().await.insert(device_id.to_string(), count);
    }

    /// Fails the next `count` writes to the device.
    pub async fn fail_writes(&self, device_id: &str, count: u32) {
        self.write_failures.lock().await.insert(device_id.to_string(), count);
    }

    pub async fn delay_reads(&self, delay: Duration) {
        *self.read_delay.lock().await = Some(delay);
    }

    /// Blocks every write until `release_writes` is called.
    pub async fn hold_writes(&self) {
        *self.write_gate.lock().await = Some(Arc::new(Semaphore::new(0)));
    }

    pub async fn release_writes(&self) {
        if let Some(gate) = self.write_gate.lock().await.take() {
            gate.close();
        }
    }

    pub async fn read_count(&self, device_id: &str) -> usize {
        self.reads.lock().await.get(device_id).copied().unwrap_or(0)
    }

    /// Writes received, including failed and held ones.
    pub async fn write_count(&self, device_id: &str) -> usize {
        self.writes.lock().await.get(device_id).copied().unwrap_or(0)
    }

    pub async fn wait_for_writes(&self, device_id: &str, count: usize) {
        while self.write_count(device_id).await < count {
            tokio::task::yield_now().await;
        }
    }

    async fn take_failure(failures: &Mutex<HashMap<DeviceId, u32>>, device_id: &str) -> bool {
        let mut failures = failures.lock().await;
        match failures.get_mut(device_id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl DeviceDriver for ScriptedDriver {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn read(&self, device_id: &str) -> Result<Vec<MetricReading>, DriverError> {
        *self.reads.lock().await.entry(device_id.to_string()).or_default() += 1;

        let delay = *self.read_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if Self::take_failure(&self.read_failures, device_id).await {
            return Err(DriverError::Failed("scripted read failure".to_string()));
        }

        let readings = self
            .readings
            .lock()
            .await
            .get(device_id)
            .map(|metrics| {
                metrics
                    .iter()
                    .map(|(metric, value)| MetricReading::new(*metric, *value))
                    .collect()
            })
            .unwrap_or_default();

        Ok(readings)
    }

    async fn write(
        &self,
        device_id: &str,
        capability: Capability,
        value: Value,
    ) -> Result<(), DriverError> {
        *self.writes.lock().await.entry(device_id.to_string()).or_default() += 1;

        let gate = self.write_gate.lock().await.clone();
        if let Some(gate) = gate {
            // Closed on release, which lets every waiter through
            let _ = gate.acquire().await;
        }

        if Self::take_failure(&self.write_failures, device_id).await {
            return Err(DriverError::Failed("scripted write failure".to_string()));
        }

        self.set_reading(device_id, capability, value).await;

        Ok(())
    }
}

pub fn outlet(id: &str) -> Device {
    Device::new(id, DeviceClass::Outlet, [Capability::OnOff])
}

pub fn light(id: &str) -> Device {
    Device::new(id, DeviceClass::Light, [Capability::OnOff])
}

pub fn environment_sensor(id: &str) -> Device {
    Device::new(
        id,
        DeviceClass::Sensor,
        [
            Capability::Temperature,
            Capability::Humidity,
            Capability::Pressure,
            Capability::Light,
        ],
    )
}

pub fn motion_sensor(id: &str) -> Device {
    Device::new(id, DeviceClass::Sensor, [Capability::Motion])
}

pub fn fast_poller_config() -> PollerConfig {
    PollerConfig {
        call_timeout: Duration::from_millis(200),
        ..Default::default()
    }
}

pub fn fast_dispatcher_config() -> DispatcherConfig {
    DispatcherConfig {
        retry_backoff: Duration::from_millis(1),
        call_timeout: Duration::from_millis(200),
        ..Default::default()
    }
}

/// Hub over the given devices, all bound to `driver`.
pub async fn create_test_hub(
    driver: Arc<ScriptedDriver>,
    devices: Vec<Device>,
    staleness: StalenessPolicy,
    with_mock: bool,
) -> DeviceHub {
    let mut builder = DeviceHub::builder()
        .poller_config(fast_poller_config())
        .dispatcher_config(fast_dispatcher_config())
        .staleness(staleness);

    if with_mock {
        builder = builder.mock_generator(Arc::new(RangeMockGenerator));
    }

    for device in devices {
        builder = builder.device(device, driver.clone());
    }

    builder.build().await.unwrap()
}
