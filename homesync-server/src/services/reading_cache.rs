use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use homesync_api::models::*;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::errors::SyncError;
use crate::models::{CachedReading, Reading};

/// Maximum reading age per metric before it counts as stale.
#[derive(Debug, Clone)]
pub struct StalenessPolicy {
    pub default_max_age: Duration,
    pub per_metric: HashMap<Capability, Duration>,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl StalenessPolicy {
    pub fn new(default_max_age: Duration) -> Self {
        Self {
            default_max_age,
            per_metric: HashMap::new(),
        }
    }

    pub fn with_max_age(mut self, metric: Capability, max_age: Duration) -> Self {
        self.per_metric.insert(metric, max_age);
        self
    }

    pub fn max_age(&self, metric: Capability) -> Duration {
        self.per_metric
            .get(&metric)
            .copied()
            .unwrap_or(self.default_max_age)
    }

    pub fn is_fresh(&self, metric: Capability, captured_at: OffsetDateTime, now: OffsetDateTime) -> bool {
        // A capture time ahead of the local clock is treated as age zero
        match Duration::try_from(now - captured_at) {
            Ok(age) => age < self.max_age(metric),
            Err(_) => true,
        }
    }
}

/// Last known reading per (device, metric). Entries are only ever replaced,
/// so memory is bounded by devices times metrics.
pub struct ReadingCache {
    entries: RwLock<BTreeMap<DeviceId, BTreeMap<Capability, Reading>>>,
    policy: StalenessPolicy,
}

impl ReadingCache {
    pub fn new(policy: StalenessPolicy) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> &StalenessPolicy {
        &self.policy
    }

    /// Stores a live reading. Returns `false` if a strictly newer reading is
    /// already cached for the key, which is then kept.
    pub async fn put(
        &self,
        device_id: &str,
        metric: Capability,
        value: Value,
        unit: &str,
        captured_at: OffsetDateTime,
    ) -> bool {
        let mut entries = self.entries.write().await;
        let metrics = entries.entry(device_id.to_string()).or_default();

        if let Some(existing) = metrics.get(&metric) {
            if existing.captured_at > captured_at {
                return false;
            }
        }

        metrics.insert(
            metric,
            Reading {
                device_id: device_id.to_string(),
                metric,
                value,
                unit: unit.to_string(),
                captured_at,
                source: Source::Live,
            },
        );

        true
    }

    pub async fn get(&self, device_id: &str, metric: Capability) -> Result<CachedReading, SyncError> {
        self.get_at(device_id, metric, OffsetDateTime::now_utc()).await
    }

    pub async fn get_at(
        &self,
        device_id: &str,
        metric: Capability,
        now: OffsetDateTime,
    ) -> Result<CachedReading, SyncError> {
        let entries = self.entries.read().await;
        let reading = entries
            .get(device_id)
            .and_then(|metrics| metrics.get(&metric))
            .cloned()
            .ok_or_else(|| SyncError::NotFound {
                device_id: device_id.to_string(),
                metric,
            })?;

        let fresh = self.policy.is_fresh(metric, reading.captured_at, now);

        Ok(CachedReading { reading, fresh })
    }
}
