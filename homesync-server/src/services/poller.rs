use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use homesync_api::models::*;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};

use super::{DeviceRegistry, EventBus, ReadingCache, SyncEvent};
use crate::drivers::{DriverBindings, MetricReading};
use crate::errors::DriverError;
use crate::models::{Device, HealthTransition};

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Interval between sensor poll rounds
    pub sensor_interval: Duration,
    /// Interval between light and outlet poll rounds
    pub actuator_interval: Duration,
    /// Maximum devices polled at the same time
    pub concurrency: usize,
    /// Per-call timeout, a timed out read counts as a failure
    pub call_timeout: Duration,
    /// Consecutive failures before a device is degraded
    pub failure_threshold: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            sensor_interval: Duration::from_secs(5),
            actuator_interval: Duration::from_secs(15),
            concurrency: 4,
            call_timeout: Duration::from_secs(3),
            failure_threshold: 3,
        }
    }
}

impl PollerConfig {
    pub fn interval_for(&self, class: DeviceClass) -> Duration {
        if class.is_actuator() {
            self.actuator_interval
        } else {
            self.sensor_interval
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub polled: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Devices that transitioned to degraded during this round
    pub degraded: usize,
}

enum PollOutcome {
    Succeeded,
    Failed { degraded: bool },
}

/// Periodically refreshes readings and keeps per-device health.
///
/// Reconciliation is detect-and-report: when a polled value differs from the
/// desired one, the poller logs a warning and publishes
/// [`SyncEvent::StateDrift`]. It never re-issues writes; that stays with the
/// [`CommandDispatcher`](super::CommandDispatcher).
pub struct Poller {
    registry: Arc<DeviceRegistry>,
    cache: Arc<ReadingCache>,
    drivers: DriverBindings,
    events: Arc<EventBus>,
    config: PollerConfig,
}

impl Poller {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        cache: Arc<ReadingCache>,
        drivers: DriverBindings,
        events: Arc<EventBus>,
        config: PollerConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            drivers,
            events,
            config,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Runs one round over every device of `class`, or every device.
    pub async fn poll_once(&self, class: Option<DeviceClass>) -> PollSummary {
        let devices = self.registry.list(class).await;

        let outcomes: Vec<PollOutcome> = devices
            .stream()
            .map(|device| self.poll_device(device))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut summary = PollSummary {
            polled: outcomes.len(),
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome {
                PollOutcome::Succeeded => summary.succeeded += 1,
                PollOutcome::Failed { degraded } => {
                    summary.failed += 1;
                    if degraded {
                        summary.degraded += 1;
                    }
                }
            }
        }

        debug!(?class, ?summary, "Poll round finished");

        summary
    }

    async fn poll_device(&self, device: Device) -> PollOutcome {
        let Some(driver) = self.drivers.get(&device.id) else {
            return self
                .fail(&device, DriverError::Failed("no driver bound".to_string()))
                .await;
        };

        // Request start time orders this result against concurrent writers
        let requested_at = OffsetDateTime::now_utc();

        let result = match timeout(self.config.call_timeout, driver.read(&device.id)).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::Timeout(self.config.call_timeout)),
        };

        match result {
            Ok(readings) => {
                self.apply_readings(&device, readings, requested_at).await;

                match self.registry.record_success(&device.id, requested_at).await {
                    Ok(Some(transition)) => self.publish_transition(&device.id, transition, 0),
                    Ok(None) => {}
                    Err(e) => warn!(device_id = %device.id, "Failed to record poll success: {}", e),
                }

                PollOutcome::Succeeded
            }
            Err(e) => self.fail(&device, e).await,
        }
    }

    async fn apply_readings(
        &self,
        device: &Device,
        readings: Vec<MetricReading>,
        captured_at: OffsetDateTime,
    ) {
        for reading in readings {
            if !device.supports(reading.metric) {
                continue;
            }

            if reading.value.kind() != reading.metric.kind() {
                warn!(
                    device_id = %device.id,
                    metric = %reading.metric,
                    "Driver returned a {} value, expected {}",
                    reading.value.kind(),
                    reading.metric.kind()
                );
                continue;
            }

            self.cache
                .put(&device.id, reading.metric, reading.value, reading.metric.unit(), captured_at)
                .await;

            match self
                .registry
                .update_observed_state(&device.id, reading.metric, reading.value, captured_at)
                .await
            {
                Ok(true) => {
                    self.events.publish(SyncEvent::ReadingUpdated {
                        device_id: device.id.clone(),
                        metric: reading.metric,
                        value: reading.value,
                        timestamp: captured_at,
                    });
                }
                Ok(false) => {}
                Err(e) => warn!(device_id = %device.id, "Failed to record observation: {}", e),
            }

            if let Some(desired) = device.desired.get(&reading.metric) {
                if *desired != reading.value {
                    warn!(
                        device_id = %device.id,
                        capability = %reading.metric,
                        %desired,
                        observed = %reading.value,
                        "Device state drifted from last applied command"
                    );
                    self.events.publish(SyncEvent::StateDrift {
                        device_id: device.id.clone(),
                        capability: reading.metric,
                        desired: *desired,
                        observed: reading.value,
                    });
                }
            }
        }
    }

    async fn fail(&self, device: &Device, error: DriverError) -> PollOutcome {
        let attempt = device.consecutive_failures + 1;
        warn!(device_id = %device.id, operation = "read", attempt, "Poll failed: {}", error);

        match self
            .registry
            .record_failure(&device.id, error.to_string(), self.config.failure_threshold)
            .await
        {
            Ok(Some(transition)) => {
                self.publish_transition(&device.id, transition, attempt);
                PollOutcome::Failed {
                    degraded: transition == HealthTransition::Degraded,
                }
            }
            Ok(None) => PollOutcome::Failed { degraded: false },
            Err(e) => {
                warn!(device_id = %device.id, "Failed to record poll failure: {}", e);
                PollOutcome::Failed { degraded: false }
            }
        }
    }

    fn publish_transition(&self, device_id: &str, transition: HealthTransition, failures: u32) {
        let health = match transition {
            HealthTransition::Degraded => {
                warn!(device_id, failures, "Device degraded");
                Health::Degraded
            }
            HealthTransition::Recovered => {
                info!(device_id, "Device recovered");
                Health::Healthy
            }
        };

        self.events.publish(SyncEvent::HealthChanged {
            device_id: device_id.to_string(),
            health,
            consecutive_failures: failures,
            timestamp: OffsetDateTime::now_utc(),
        });
    }

    /// Spawns one polling task per device class.
    pub fn start(self: &Arc<Self>) -> PollerHandle {
        let tasks = [DeviceClass::Sensor, DeviceClass::Light, DeviceClass::Outlet]
            .into_iter()
            .map(|class| {
                let poller = self.clone();
                let period = self.config.interval_for(class).max(Duration::from_millis(1));

                tokio::spawn(async move {
                    let mut ticker = interval(period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                    info!(?class, ?period, "Polling started");

                    loop {
                        ticker.tick().await;
                        poller.poll_once(Some(class)).await;
                    }
                })
            })
            .collect();

        PollerHandle { tasks }
    }
}

pub struct PollerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        info!("Polling stopped");
    }
}
