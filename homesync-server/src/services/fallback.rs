use std::sync::Arc;

use homesync_api::models::*;
use rand::Rng;
use time::OffsetDateTime;
use tracing::debug;

use super::{DeviceRegistry, ReadingCache};
use crate::errors::SyncError;
use crate::models::{Device, Reading};

/// Synthesizes a placeholder value when no trustworthy reading exists.
pub trait MockGenerator: Send + Sync {
    fn generate(&self, device: &Device, metric: Capability) -> Value;
}

/// Uniform values inside a plausible indoor range:
///
/// | metric      | range            |
/// |-------------|------------------|
/// | temperature | 22 - 26 °C       |
/// | humidity    | 40 - 60 %        |
/// | pressure    | 1010 - 1015 hPa  |
/// | light       | 100 - 800 lx     |
/// | motion      | random boolean   |
/// | on_off      | last known state |
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeMockGenerator;

impl RangeMockGenerator {
    pub fn range(metric: Capability) -> Option<(f64, f64)> {
        match metric {
            Capability::Temperature => Some((22.0, 26.0)),
            Capability::Humidity => Some((40.0, 60.0)),
            Capability::Pressure => Some((1010.0, 1015.0)),
            Capability::Light => Some((100.0, 800.0)),
            Capability::OnOff | Capability::Motion => None,
        }
    }
}

impl MockGenerator for RangeMockGenerator {
    fn generate(&self, device: &Device, metric: Capability) -> Value {
        let mut rng = rand::rng();

        match metric {
            Capability::OnOff => device
                .observed_value(Capability::OnOff)
                .unwrap_or(Value::Bool(false)),
            Capability::Motion => Value::Bool(rng.random_bool(0.5)),
            _ => {
                let (low, high) = Self::range(metric).unwrap_or((0.0, 0.0));
                let value: f64 = rng.random_range(low..=high);
                Value::Number((value * 100.0).round() / 100.0)
            }
        }
    }
}

/// Decides which value a caller sees for a (device, metric) and labels its
/// provenance.
pub struct FallbackPolicy {
    registry: Arc<DeviceRegistry>,
    cache: Arc<ReadingCache>,
    mock: Option<Arc<dyn MockGenerator>>,
    serve_stale: bool,
}

impl FallbackPolicy {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        cache: Arc<ReadingCache>,
        mock: Option<Arc<dyn MockGenerator>>,
        serve_stale: bool,
    ) -> Self {
        Self {
            registry,
            cache,
            mock,
            serve_stale,
        }
    }

    pub fn has_mock(&self) -> bool {
        self.mock.is_some()
    }

    pub async fn resolve(&self, device_id: &str, metric: Capability) -> Result<Reading, SyncError> {
        self.resolve_at(device_id, metric, OffsetDateTime::now_utc()).await
    }

    /// Resolution order: live when the device is healthy and the entry fresh,
    /// then mock, then the stale entry if `serve_stale` is set.
    pub async fn resolve_at(
        &self,
        device_id: &str,
        metric: Capability,
        now: OffsetDateTime,
    ) -> Result<Reading, SyncError> {
        let device = self.registry.get(device_id).await?;
        if !device.supports(metric) {
            return Err(SyncError::UnsupportedCapability {
                device_id: device_id.to_string(),
                capability: metric,
            });
        }

        let cached = match self.cache.get_at(device_id, metric, now).await {
            Ok(cached) => Some(cached),
            Err(SyncError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        if let Some(cached) = &cached {
            if cached.fresh && device.health == Health::Healthy {
                return Ok(cached.reading.clone().with_source(Source::Live));
            }
        }

        if let Some(mock) = &self.mock {
            debug!(device_id, %metric, health = ?device.health, "Serving mock reading");

            return Ok(Reading {
                device_id: device_id.to_string(),
                metric,
                value: mock.generate(&device, metric),
                unit: metric.unit().to_string(),
                captured_at: now,
                source: Source::Mock,
            });
        }

        match cached {
            Some(cached) if self.serve_stale => Ok(cached.reading.with_source(Source::Cached)),
            _ => Err(SyncError::SensorUnavailable {
                device_id: device_id.to_string(),
                metric,
            }),
        }
    }
}
