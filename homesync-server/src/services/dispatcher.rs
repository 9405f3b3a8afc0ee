use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use homesync_api::models::*;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{DeviceRegistry, EventBus, ReadingCache, SyncEvent};
use crate::drivers::DriverBindings;
use crate::errors::{DriverError, SyncError};
use crate::models::{Intent, IntentOutcome};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Retries after the first failed write
    pub max_retries: u32,
    /// Base delay, the nth retry waits `n * retry_backoff`
    pub retry_backoff: Duration,
    /// Per-call timeout for driver writes
    pub call_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_backoff: Duration::from_millis(200),
            call_timeout: Duration::from_secs(5),
        }
    }
}

/// Applies control intents to devices.
///
/// Each device has at most one pending intent and one write lane; a newer
/// submission supersedes the pending one, while other devices proceed
/// independently.
pub struct CommandDispatcher {
    registry: Arc<DeviceRegistry>,
    cache: Arc<ReadingCache>,
    drivers: DriverBindings,
    events: Arc<EventBus>,
    config: DispatcherConfig,
    pending: Mutex<HashMap<DeviceId, Intent>>,
    lanes: Mutex<HashMap<DeviceId, Arc<Mutex<()>>>>,
}

impl CommandDispatcher {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        cache: Arc<ReadingCache>,
        drivers: DriverBindings,
        events: Arc<EventBus>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            drivers,
            events,
            config,
            pending: Mutex::new(HashMap::new()),
            lanes: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Snapshot of the intent currently pending for a device.
    pub async fn pending(&self, device_id: &str) -> Option<Intent> {
        self.pending.lock().await.get(device_id).cloned()
    }

    /// Validates and applies an intent, returning once it reaches a terminal
    /// status.
    ///
    /// The write and its retries run on a spawned task, so an intent still
    /// resolves when the caller stops waiting for it.
    pub async fn submit(
        self: &Arc<Self>,
        device_id: &str,
        capability: Capability,
        value: Value,
    ) -> Result<IntentOutcome, SyncError> {
        let device = self.registry.get(device_id).await?;

        if !device.supports(capability) || !capability.is_writable() {
            return Err(SyncError::UnsupportedCapability {
                device_id: device_id.to_string(),
                capability,
            });
        }

        if value.kind() != capability.kind() {
            return Err(SyncError::InvalidValue {
                capability,
                expected: capability.kind(),
            });
        }

        let intent = Intent::new(device_id, capability, value);
        let intent_id = intent.id;

        if let Some(previous) = self.pending.lock().await.insert(device_id.to_string(), intent) {
            info!(device_id, intent_id = %previous.id, "Intent superseded");
            self.events.publish(SyncEvent::IntentResolved {
                intent_id: previous.id,
                device_id: previous.device_id,
                capability: previous.capability,
                status: IntentStatus::Superseded,
                retry_count: previous.retry_count,
            });
        }

        let task = tokio::spawn({
            let dispatcher = Arc::clone(self);
            let device_id = device_id.to_string();
            async move { dispatcher.apply(&device_id, intent_id, capability, value).await }
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(device_id, %intent_id, "Intent task ended abnormally: {}", e);
                Ok(self.finish(device_id, intent_id, IntentStatus::Failed, 0).await)
            }
        }
    }

    async fn apply(
        &self,
        device_id: &str,
        intent_id: Uuid,
        capability: Capability,
        value: Value,
    ) -> Result<IntentOutcome, SyncError> {
        let lane = self.lane(device_id).await;
        let _guard = lane.lock().await;

        if !self.is_current(device_id, intent_id).await {
            return Ok(IntentOutcome {
                intent_id,
                status: IntentStatus::Superseded,
                retry_count: 0,
            });
        }

        // Re-read under the lane so the previous intent's result is visible
        let device = self.registry.get(device_id).await?;
        if device.observed_value(capability) == Some(value) {
            debug!(device_id, %capability, %value, "Value already applied, skipping write");
            self.registry.set_desired(device_id, capability, value).await?;
            return Ok(self.finish(device_id, intent_id, IntentStatus::Applied, 0).await);
        }

        let mut retry_count = 0;
        loop {
            let attempt = retry_count + 1;

            match self.write(device_id, capability, value).await {
                Ok(()) => {
                    let applied_at = OffsetDateTime::now_utc();
                    self.registry
                        .update_observed_state(device_id, capability, value, applied_at)
                        .await?;
                    self.registry.set_desired(device_id, capability, value).await?;
                    self.cache
                        .put(device_id, capability, value, capability.unit(), applied_at)
                        .await;
                    self.events.publish(SyncEvent::ReadingUpdated {
                        device_id: device_id.to_string(),
                        metric: capability,
                        value,
                        timestamp: applied_at,
                    });

                    info!(device_id, %capability, %value, attempt, "Intent applied");
                    return Ok(self
                        .finish(device_id, intent_id, IntentStatus::Applied, retry_count)
                        .await);
                }
                Err(e) => {
                    warn!(device_id, operation = "write", attempt, "Device write failed: {}", e);

                    if retry_count >= self.config.max_retries {
                        return Ok(self
                            .finish(device_id, intent_id, IntentStatus::Failed, retry_count)
                            .await);
                    }

                    if !self.is_current(device_id, intent_id).await {
                        return Ok(IntentOutcome {
                            intent_id,
                            status: IntentStatus::Superseded,
                            retry_count,
                        });
                    }

                    retry_count += 1;
                    self.set_retry_count(device_id, intent_id, retry_count).await;
                    sleep(self.config.retry_backoff * retry_count).await;
                }
            }
        }
    }

    async fn write(
        &self,
        device_id: &str,
        capability: Capability,
        value: Value,
    ) -> Result<(), DriverError> {
        let driver = self
            .drivers
            .get(device_id)
            .ok_or_else(|| DriverError::Failed("no driver bound".to_string()))?;

        match timeout(self.config.call_timeout, driver.write(device_id, capability, value)).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::Timeout(self.config.call_timeout)),
        }
    }

    async fn lane(&self, device_id: &str) -> Arc<Mutex<()>> {
        self.lanes
            .lock()
            .await
            .entry(device_id.to_string())
            .or_default()
            .clone()
    }

    async fn is_current(&self, device_id: &str, intent_id: Uuid) -> bool {
        self.pending
            .lock()
            .await
            .get(device_id)
            .is_some_and(|intent| intent.id == intent_id)
    }

    async fn set_retry_count(&self, device_id: &str, intent_id: Uuid, retry_count: u32) {
        if let Some(intent) = self.pending.lock().await.get_mut(device_id) {
            if intent.id == intent_id {
                intent.retry_count = retry_count;
            }
        }
    }

    /// Removes the intent if it is still the current one. An intent replaced
    /// while in flight reports `Superseded` regardless of `status`.
    async fn finish(
        &self,
        device_id: &str,
        intent_id: Uuid,
        status: IntentStatus,
        retry_count: u32,
    ) -> IntentOutcome {
        let mut pending = self.pending.lock().await;

        let intent = match pending.get(device_id) {
            Some(intent) if intent.id == intent_id => pending.remove(device_id),
            _ => None,
        };

        let Some(intent) = intent else {
            return IntentOutcome {
                intent_id,
                status: IntentStatus::Superseded,
                retry_count,
            };
        };

        self.events.publish(SyncEvent::IntentResolved {
            intent_id,
            device_id: intent.device_id,
            capability: intent.capability,
            status,
            retry_count,
        });

        IntentOutcome {
            intent_id,
            status,
            retry_count,
        }
    }
}
