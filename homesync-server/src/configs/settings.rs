use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use homesync_api::models::{Capability, DeviceClass, DeviceId};
use serde::{Deserialize, Serialize};

use crate::services::{DispatcherConfig, PollerConfig, StalenessPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, empty allows any
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Poller {
    pub sensor_interval_ms: u64,
    pub actuator_interval_ms: u64,
    pub concurrency: usize,
    pub call_timeout_ms: u64,
    pub failure_threshold: u32,
}

impl Default for Poller {
    fn default() -> Self {
        Self {
            sensor_interval_ms: 5_000,
            actuator_interval_ms: 15_000,
            concurrency: 4,
            call_timeout_ms: 3_000,
            failure_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Dispatcher {
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub call_timeout_ms: u64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_backoff_ms: 200,
            call_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Fallback {
    pub mock_enabled: bool,
    pub serve_stale: bool,
    pub default_max_age_ms: u64,
    /// Per-metric overrides of `default_max_age_ms`
    pub max_age_ms: MaxAges,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxAges {
    pub on_off: Option<u64>,
    pub temperature: Option<u64>,
    pub humidity: Option<u64>,
    pub pressure: Option<u64>,
    pub light: Option<u64>,
    pub motion: Option<u64>,
}

impl MaxAges {
    pub fn get(&self, metric: Capability) -> Option<u64> {
        match metric {
            Capability::OnOff => self.on_off,
            Capability::Temperature => self.temperature,
            Capability::Humidity => self.humidity,
            Capability::Pressure => self.pressure,
            Capability::Light => self.light,
            Capability::Motion => self.motion,
        }
    }
}

impl Default for Fallback {
    fn default() -> Self {
        Self {
            mock_enabled: true,
            serve_stale: false,
            default_max_age_ms: 30_000,
            max_age_ms: MaxAges::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bridge {
    pub base_url: String,
    #[serde(default = "Bridge::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Bridge {
    fn default_timeout_ms() -> u64 {
        3_000
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    #[default]
    Simulated,
    Bridge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub id: DeviceId,
    pub class: DeviceClass,
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub driver: DriverKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    #[serde(default)]
    pub poller: Poller,
    #[serde(default)]
    pub dispatcher: Dispatcher,
    #[serde(default)]
    pub fallback: Fallback,
    pub bridge: Option<Bridge>,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(
                Environment::with_prefix("HOMESYNC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn staleness_policy(&self) -> StalenessPolicy {
        Capability::ALL.into_iter().fold(
            StalenessPolicy::new(Duration::from_millis(self.fallback.default_max_age_ms)),
            |policy, metric| match self.fallback.max_age_ms.get(metric) {
                Some(max_age_ms) => policy.with_max_age(metric, Duration::from_millis(max_age_ms)),
                None => policy,
            },
        )
    }
}

impl From<&Poller> for PollerConfig {
    fn from(poller: &Poller) -> Self {
        PollerConfig {
            sensor_interval: Duration::from_millis(poller.sensor_interval_ms),
            actuator_interval: Duration::from_millis(poller.actuator_interval_ms),
            concurrency: poller.concurrency,
            call_timeout: Duration::from_millis(poller.call_timeout_ms),
            failure_threshold: poller.failure_threshold,
        }
    }
}

impl From<&Dispatcher> for DispatcherConfig {
    fn from(dispatcher: &Dispatcher) -> Self {
        DispatcherConfig {
            max_retries: dispatcher.max_retries,
            retry_backoff: Duration::from_millis(dispatcher.retry_backoff_ms),
            call_timeout: Duration::from_millis(dispatcher.call_timeout_ms),
        }
    }
}
