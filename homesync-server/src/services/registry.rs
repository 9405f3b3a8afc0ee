use std::collections::BTreeMap;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use homesync_api::models::*;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::SyncError;
use crate::models::{Device, HealthTransition, Observation};

type DeviceHandle = Arc<RwLock<Device>>;

/// Owner of every device record.
///
/// The outer lock guards membership only; each device has its own lock so
/// updates to different devices never contend.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<BTreeMap<DeviceId, DeviceHandle>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, device: Device) -> Result<(), SyncError> {
        let mut devices = self.devices.write().await;
        if devices.contains_key(&device.id) {
            return Err(SyncError::DuplicateDevice(device.id));
        }

        debug!("Registered {:?} device {}", device.class, device.id);
        devices.insert(device.id.clone(), Arc::new(RwLock::new(device)));

        Ok(())
    }

    async fn handle(&self, device_id: &str) -> Result<DeviceHandle, SyncError> {
        self.devices
            .read()
            .await
            .get(device_id)
            .cloned()
            .ok_or_else(|| SyncError::UnknownDevice(device_id.to_string()))
    }

    /// Returns a snapshot; later mutations do not affect it.
    pub async fn get(&self, device_id: &str) -> Result<Device, SyncError> {
        let handle = self.handle(device_id).await?;
        let device = handle.read().await.clone();

        Ok(device)
    }

    pub async fn list(&self, class: Option<DeviceClass>) -> DeviceListing {
        let handles = self.devices.read().await.values().cloned().collect();

        DeviceListing { handles, class }
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }

    /// Records an observed value unless a newer one is already stored.
    ///
    /// Returns `Ok(false)` when the write was dropped as out of date.
    pub async fn update_observed_state(
        &self,
        device_id: &str,
        capability: Capability,
        value: Value,
        timestamp: OffsetDateTime,
    ) -> Result<bool, SyncError> {
        let handle = self.handle(device_id).await?;
        let mut device = handle.write().await;

        if !device.supports(capability) {
            return Err(SyncError::UnsupportedCapability {
                device_id: device_id.to_string(),
                capability,
            });
        }

        if let Some(current) = device.observed.get(&capability) {
            if timestamp < current.timestamp {
                debug!(
                    device_id,
                    %capability,
                    "Dropped observation older than stored state"
                );
                return Ok(false);
            }
        }

        device
            .observed
            .insert(capability, Observation { value, timestamp });

        Ok(true)
    }

    pub async fn set_desired(
        &self,
        device_id: &str,
        capability: Capability,
        value: Value,
    ) -> Result<(), SyncError> {
        let handle = self.handle(device_id).await?;
        let mut device = handle.write().await;

        if !device.supports(capability) {
            return Err(SyncError::UnsupportedCapability {
                device_id: device_id.to_string(),
                capability,
            });
        }

        device.desired.insert(capability, value);

        Ok(())
    }

    pub async fn record_success(
        &self,
        device_id: &str,
        at: OffsetDateTime,
    ) -> Result<Option<HealthTransition>, SyncError> {
        let handle = self.handle(device_id).await?;
        let mut device = handle.write().await;

        device.consecutive_failures = 0;
        device.last_success_time = Some(device.last_success_time.map_or(at, |last| last.max(at)));

        if device.health == Health::Degraded {
            device.health = Health::Healthy;
            return Ok(Some(HealthTransition::Recovered));
        }

        Ok(None)
    }

    pub async fn record_failure(
        &self,
        device_id: &str,
        error: impl Into<String>,
        threshold: u32,
    ) -> Result<Option<HealthTransition>, SyncError> {
        let handle = self.handle(device_id).await?;
        let mut device = handle.write().await;

        device.consecutive_failures = device.consecutive_failures.saturating_add(1);
        device.last_error = Some(error.into());

        if device.health == Health::Healthy && device.consecutive_failures >= threshold.max(1) {
            device.health = Health::Degraded;
            return Ok(Some(HealthTransition::Degraded));
        }

        Ok(None)
    }
}

/// Handles captured at `list` time. Each pass over the listing takes fresh
/// snapshots, so it can be consumed more than once.
#[derive(Clone)]
pub struct DeviceListing {
    handles: Vec<DeviceHandle>,
    class: Option<DeviceClass>,
}

impl DeviceListing {
    pub fn stream(&self) -> BoxStream<'static, Device> {
        let class = self.class;

        stream::iter(self.handles.clone())
            .filter_map(move |handle| async move {
                let device = handle.read().await.clone();
                class
                    .is_none_or(|class| device.class == class)
                    .then_some(device)
            })
            .boxed()
    }

    pub async fn snapshot(&self) -> Vec<Device> {
        self.stream().collect().await
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    fn outlet(id: &str) -> Device {
        Device::new(id, DeviceClass::Outlet, [Capability::OnOff])
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let registry = DeviceRegistry::new();

        registry.register(outlet("main_outlet")).await.unwrap();
        let result = registry.register(outlet("main_outlet")).await;

        assert_eq!(result, Err(SyncError::DuplicateDevice("main_outlet".into())));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_unknown_device() {
        let registry = DeviceRegistry::new();

        let result = registry.get("garage").await;

        assert_eq!(result, Err(SyncError::UnknownDevice("garage".into())));
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let registry = DeviceRegistry::new();
        registry.register(outlet("main_outlet")).await.unwrap();

        let before = registry.get("main_outlet").await.unwrap();
        registry
            .update_observed_state("main_outlet", Capability::OnOff, true.into(), OffsetDateTime::now_utc())
            .await
            .unwrap();

        assert!(before.observed.is_empty());
        assert_eq!(
            registry.get("main_outlet").await.unwrap().observed_value(Capability::OnOff),
            Some(Value::Bool(true))
        );
    }

    #[tokio::test]
    async fn test_older_observation_is_dropped() {
        let registry = DeviceRegistry::new();
        registry.register(outlet("main_outlet")).await.unwrap();

        let t2 = OffsetDateTime::now_utc();
        let t1 = t2 - Duration::seconds(5);

        let applied = registry
            .update_observed_state("main_outlet", Capability::OnOff, true.into(), t2)
            .await
            .unwrap();
        assert!(applied);

        let applied = registry
            .update_observed_state("main_outlet", Capability::OnOff, false.into(), t1)
            .await
            .unwrap();
        assert!(!applied);

        let device = registry.get("main_outlet").await.unwrap();
        assert_eq!(device.observed[&Capability::OnOff].value, Value::Bool(true));
        assert_eq!(device.observed[&Capability::OnOff].timestamp, t2);
    }

    #[tokio::test]
    async fn test_unsupported_capability() {
        let registry = DeviceRegistry::new();
        registry.register(outlet("main_outlet")).await.unwrap();

        let result = registry
            .update_observed_state(
                "main_outlet",
                Capability::Temperature,
                21.0.into(),
                OffsetDateTime::now_utc(),
            )
            .await;

        assert!(matches!(result, Err(SyncError::UnsupportedCapability { .. })));
    }

    #[tokio::test]
    async fn test_health_transitions() {
        let registry = DeviceRegistry::new();
        registry.register(outlet("main_outlet")).await.unwrap();

        for _ in 0..2 {
            let transition = registry.record_failure("main_outlet", "timeout", 3).await.unwrap();
            assert_eq!(transition, None);
        }

        let transition = registry.record_failure("main_outlet", "timeout", 3).await.unwrap();
        assert_eq!(transition, Some(HealthTransition::Degraded));

        // Further failures stay degraded without a new transition
        let transition = registry.record_failure("main_outlet", "timeout", 3).await.unwrap();
        assert_eq!(transition, None);
        assert_eq!(registry.get("main_outlet").await.unwrap().consecutive_failures, 4);

        let transition = registry
            .record_success("main_outlet", OffsetDateTime::now_utc())
            .await
            .unwrap();
        assert_eq!(transition, Some(HealthTransition::Recovered));

        let device = registry.get("main_outlet").await.unwrap();
        assert_eq!(device.health, Health::Healthy);
        assert_eq!(device.consecutive_failures, 0);
        assert_eq!(device.last_error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_listing_filters_and_restarts() {
        let registry = DeviceRegistry::new();
        registry.register(outlet("main_outlet")).await.unwrap();
        registry
            .register(Device::new("living_room", DeviceClass::Light, [Capability::OnOff]))
            .await
            .unwrap();

        let listing = registry.list(Some(DeviceClass::Light)).await;

        let first: Vec<_> = listing.snapshot().await.into_iter().map(|d| d.id).collect();
        let second: Vec<_> = listing.snapshot().await.into_iter().map(|d| d.id).collect();

        assert_eq!(first, vec!["living_room".to_string()]);
        assert_eq!(first, second);
        assert_eq!(registry.list(None).await.snapshot().await.len(), 2);
    }
}
