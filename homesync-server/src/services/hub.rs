use std::sync::Arc;

use homesync_api::models::*;
use tracing::info;

use super::{
    CommandDispatcher, DeviceRegistry, DispatcherConfig, EventBus, FallbackPolicy, MockGenerator,
    Poller, PollerConfig, PollerHandle, ReadingCache, StalenessPolicy,
};
use crate::drivers::{DeviceDriver, DriverBindings};
use crate::errors::SyncError;
use crate::models::{Device, IntentOutcome, Reading};

/// Entry point used by the HTTP layer. Reads go through the fallback policy,
/// writes through the dispatcher; drivers are never called directly.
pub struct DeviceHub {
    registry: Arc<DeviceRegistry>,
    cache: Arc<ReadingCache>,
    events: Arc<EventBus>,
    poller: Arc<Poller>,
    dispatcher: Arc<CommandDispatcher>,
    fallback: FallbackPolicy,
}

impl DeviceHub {
    pub fn builder() -> HubBuilder {
        HubBuilder::default()
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ReadingCache> {
        &self.cache
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    pub fn start_polling(&self) -> PollerHandle {
        self.poller.start()
    }

    pub async fn reading(&self, device_id: &str, metric: Capability) -> Result<Reading, SyncError> {
        self.fallback.resolve(device_id, metric).await
    }

    /// Resolves every capability of a device, leaving out unavailable ones.
    /// Fails only when nothing at all can be served.
    pub async fn readings(&self, device_id: &str) -> Result<Vec<Reading>, SyncError> {
        let device = self.registry.get(device_id).await?;
        let mut readings = Vec::with_capacity(device.capabilities.len());
        let mut last_error = None;

        for metric in &device.capabilities {
            match self.fallback.resolve(device_id, *metric).await {
                Ok(reading) => readings.push(reading),
                Err(e @ SyncError::SensorUnavailable { .. }) => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        match last_error {
            Some(e) if readings.is_empty() => Err(e),
            _ => Ok(readings),
        }
    }

    pub async fn submit_intent(
        &self,
        device_id: &str,
        capability: Capability,
        value: Value,
    ) -> Result<IntentOutcome, SyncError> {
        self.dispatcher.submit(device_id, capability, value).await
    }

    pub async fn device_list(&self, class: Option<DeviceClass>) -> Vec<DeviceSummary> {
        self.registry
            .list(class)
            .await
            .snapshot()
            .await
            .iter()
            .map(Device::summary)
            .collect()
    }

    pub async fn device(&self, device_id: &str) -> Result<Device, SyncError> {
        self.registry.get(device_id).await
    }
}

#[derive(Default)]
pub struct HubBuilder {
    devices: Vec<(Device, Arc<dyn DeviceDriver>)>,
    poller: PollerConfig,
    dispatcher: DispatcherConfig,
    staleness: StalenessPolicy,
    mock: Option<Arc<dyn MockGenerator>>,
    serve_stale: bool,
    event_capacity: Option<usize>,
}

impl HubBuilder {
    pub fn device(mut self, device: Device, driver: Arc<dyn DeviceDriver>) -> Self {
        self.devices.push((device, driver));
        self
    }

    pub fn poller_config(mut self, config: PollerConfig) -> Self {
        self.poller = config;
        self
    }

    pub fn dispatcher_config(mut self, config: DispatcherConfig) -> Self {
        self.dispatcher = config;
        self
    }

    pub fn staleness(mut self, policy: StalenessPolicy) -> Self {
        self.staleness = policy;
        self
    }

    pub fn mock_generator(mut self, generator: Arc<dyn MockGenerator>) -> Self {
        self.mock = Some(generator);
        self
    }

    pub fn serve_stale(mut self, serve_stale: bool) -> Self {
        self.serve_stale = serve_stale;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    pub async fn build(self) -> Result<DeviceHub, SyncError> {
        let registry = Arc::new(DeviceRegistry::new());
        let cache = Arc::new(ReadingCache::new(self.staleness));
        let events = Arc::new(
            self.event_capacity
                .map(EventBus::new)
                .unwrap_or_default(),
        );
        let mut drivers = DriverBindings::new();

        for (device, driver) in self.devices {
            drivers.bind(device.id.clone(), driver);
            registry.register(device).await?;
        }

        info!(
            devices = registry.len().await,
            mock = self.mock.is_some(),
            serve_stale = self.serve_stale,
            "Device hub ready"
        );

        let poller = Arc::new(Poller::new(
            registry.clone(),
            cache.clone(),
            drivers.clone(),
            events.clone(),
            self.poller,
        ));
        let dispatcher = Arc::new(CommandDispatcher::new(
            registry.clone(),
            cache.clone(),
            drivers,
            events.clone(),
            self.dispatcher,
        ));
        let fallback = FallbackPolicy::new(registry.clone(), cache.clone(), self.mock, self.serve_stale);

        Ok(DeviceHub {
            registry,
            cache,
            events,
            poller,
            dispatcher,
            fallback,
        })
    }
}
