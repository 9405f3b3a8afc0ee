use std::collections::HashMap;
use std::f64::consts::PI;

use async_trait::async_trait;
use homesync_api::models::{Capability, DeviceId, Value, ValueKind};
use rand::Rng;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{DeviceDriver, MetricReading};
use crate::errors::DriverError;

const MAX_SUNLIGHT_LUX: f64 = 500.0;
const MAX_MOONLIGHT_LUX: f64 = 5.0;

const SUNRISE_START: f64 = 0.23;
const SUNRISE_END: f64 = 0.25;
const SUNSET_START: f64 = 0.73;
const SUNSET_END: f64 = 0.75;

const STANDARD_PRESSURE_HPA: f64 = 1013.25;

/// In-process stand-in for absent hardware.
///
/// Sensor values follow a diurnal curve driven by the UTC time of day and
/// switch state lives in memory, so every device bound to it always answers.
#[derive(Default)]
pub struct SimulatedDriver {
    switches: RwLock<HashMap<DeviceId, bool>>,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn day_fraction(now: OffsetDateTime) -> f64 {
        let (hour, minute, second) = now.to_hms();
        let seconds = hour as u32 * 3600 + minute as u32 * 60 + second as u32;

        seconds as f64 / 86400.0
    }
}

pub fn simulated_lux(day_fraction: f64) -> f64 {
    if (SUNRISE_START..=SUNSET_END).contains(&day_fraction) {
        if day_fraction <= SUNRISE_END {
            let radians = (day_fraction - SUNRISE_START) / (SUNRISE_END - SUNRISE_START) * PI / 2.0;
            radians.sin() * MAX_SUNLIGHT_LUX
        } else if day_fraction >= SUNSET_START {
            let radians = (day_fraction - SUNSET_START) / (SUNSET_END - SUNSET_START) * PI / 2.0;
            radians.cos() * MAX_SUNLIGHT_LUX
        } else {
            MAX_SUNLIGHT_LUX
        }
    } else {
        // Moonlight peaks at midnight
        let radians = day_fraction * 2.0 * PI;
        (radians + PI).cos().max(0.0) * (MAX_MOONLIGHT_LUX - 0.01) + 0.01
    }
}

pub fn simulated_humidity(day_fraction: f64) -> f64 {
    let radians = day_fraction * 2.0 * PI;

    if (0.3..=0.7).contains(&day_fraction) {
        (radians.sin().max(0.0) * 25.0 + 65.0).round()
    } else {
        (radians.cos().max(0.0) * 30.0 + 60.0).round()
    }
}

pub fn simulated_temperature(day_fraction: f64) -> f64 {
    let radians = day_fraction * 2.0 * PI;

    (radians.sin().max(0.0) * 20.0 + 10.0).round()
}

#[async_trait]
impl DeviceDriver for SimulatedDriver {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn read(&self, device_id: &str) -> Result<Vec<MetricReading>, DriverError> {
        let day_fraction = Self::day_fraction(OffsetDateTime::now_utc());
        let switched_on = self
            .switches
            .read()
            .await
            .get(device_id)
            .copied()
            .unwrap_or(false);

        let (pressure, motion) = {
            let mut rng = rand::rng();
            (
                STANDARD_PRESSURE_HPA + rng.random_range(-3.0..3.0),
                rng.random_bool(0.1),
            )
        };

        Ok(vec![
            MetricReading::new(Capability::Temperature, simulated_temperature(day_fraction)),
            MetricReading::new(Capability::Humidity, simulated_humidity(day_fraction)),
            MetricReading::new(Capability::Pressure, (pressure * 100.0).round() / 100.0),
            MetricReading::new(Capability::Light, simulated_lux(day_fraction).round()),
            MetricReading::new(Capability::Motion, motion),
            MetricReading::new(Capability::OnOff, switched_on),
        ])
    }

    async fn write(
        &self,
        device_id: &str,
        capability: Capability,
        value: Value,
    ) -> Result<(), DriverError> {
        let on = match (capability, value) {
            (Capability::OnOff, Value::Bool(on)) => on,
            (Capability::OnOff, _) => {
                return Err(DriverError::Failed(format!(
                    "on_off expects a {} value",
                    ValueKind::Boolean
                )));
            }
            _ => {
                return Err(DriverError::Unsupported {
                    driver: self.name(),
                    operation: "write",
                });
            }
        };

        self.switches.write().await.insert(device_id.to_string(), on);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lux_curve() {
        assert_eq!(simulated_lux(0.5), MAX_SUNLIGHT_LUX);
        assert!(simulated_lux(0.0) <= MAX_MOONLIGHT_LUX);
        assert!(simulated_lux(0.24) > 0.0 && simulated_lux(0.24) < MAX_SUNLIGHT_LUX);
    }

    #[test]
    fn test_temperature_curve() {
        assert_eq!(simulated_temperature(0.25), 30.0);
        assert_eq!(simulated_temperature(0.75), 10.0);
    }

    #[tokio::test]
    async fn test_switch_state_is_remembered() {
        let driver = SimulatedDriver::new();

        driver
            .write("main_outlet", Capability::OnOff, Value::Bool(true))
            .await
            .unwrap();

        let readings = driver.read("main_outlet").await.unwrap();
        let on_off = readings
            .iter()
            .find(|reading| reading.metric == Capability::OnOff)
            .unwrap();

        assert_eq!(on_off.value, Value::Bool(true));
    }

    #[tokio::test]
    async fn test_rejects_measurement_writes() {
        let driver = SimulatedDriver::new();

        let result = driver
            .write("environment", Capability::Temperature, Value::Number(21.0))
            .await;

        assert!(matches!(result, Err(DriverError::Unsupported { .. })));
    }
}
