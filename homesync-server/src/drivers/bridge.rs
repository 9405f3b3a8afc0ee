use std::time::Duration;

use async_trait::async_trait;
use homesync_api::models::{Capability, Value};
use serde::{Deserialize, Serialize};

use super::{DeviceDriver, MetricReading};
use crate::errors::DriverError;

#[derive(Debug, Deserialize)]
struct BridgeReadBody {
    readings: Vec<MetricReading>,
}

#[derive(Debug, Serialize)]
struct BridgeWriteBody {
    value: Value,
}

/// Forwards device calls to an HTTP daemon that owns the hardware, such as a
/// GPIO/I2C sidecar or a smart plug cloud client.
pub struct BridgeDriver {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl BridgeDriver {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DriverError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn call_error(&self, e: reqwest::Error) -> DriverError {
        if e.is_timeout() {
            DriverError::Timeout(self.timeout)
        } else {
            e.into()
        }
    }

    fn device_url(&self, device_id: &str) -> String {
        format!("{}/devices/{}", self.base_url, device_id)
    }
}

#[async_trait]
impl DeviceDriver for BridgeDriver {
    fn name(&self) -> &'static str {
        "bridge"
    }

    async fn read(&self, device_id: &str) -> Result<Vec<MetricReading>, DriverError> {
        let response = self
            .client
            .get(self.device_url(device_id))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| self.call_error(e))?;

        let body: BridgeReadBody = response.json().await.map_err(|e| self.call_error(e))?;

        Ok(body.readings)
    }

    async fn write(
        &self,
        device_id: &str,
        capability: Capability,
        value: Value,
    ) -> Result<(), DriverError> {
        self.client
            .put(format!("{}/{}", self.device_url(device_id), capability))
            .json(&BridgeWriteBody { value })
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| self.call_error(e))?;

        Ok(())
    }
}
