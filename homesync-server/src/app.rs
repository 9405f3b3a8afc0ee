use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use axum::Router;
use axum::http::HeaderValue;
use homesync_api::models::Capability;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::configs::settings::Server;
use crate::configs::{DriverKind, Settings};
use crate::drivers::{BridgeDriver, DeviceDriver, SimulatedDriver};
use crate::handles::*;
use crate::models::Device;
use crate::services::{DeviceHub, RangeMockGenerator};

/// Builds the hub from the static device configuration, rejecting
/// configurations the sync layer cannot honor.
pub async fn build_hub(settings: &Settings) -> anyhow::Result<DeviceHub> {
    let simulated: Arc<dyn DeviceDriver> = Arc::new(SimulatedDriver::new());
    let bridge: Option<Arc<dyn DeviceDriver>> = match &settings.bridge {
        Some(bridge) => {
            let driver = BridgeDriver::new(&bridge.base_url, Duration::from_millis(bridge.timeout_ms))
                .context("Failed to create bridge driver")?;
            Some(Arc::new(driver) as Arc<dyn DeviceDriver>)
        }
        None => None,
    };

    let mut builder = DeviceHub::builder()
        .poller_config((&settings.poller).into())
        .dispatcher_config((&settings.dispatcher).into())
        .staleness(settings.staleness_policy())
        .serve_stale(settings.fallback.serve_stale);

    if settings.fallback.mock_enabled {
        builder = builder.mock_generator(Arc::new(RangeMockGenerator));
    }

    let mut seen = HashSet::new();
    for entry in &settings.devices {
        if !seen.insert(entry.id.as_str()) {
            bail!("Device {} is configured more than once", entry.id);
        }

        if entry.class.is_actuator() && !entry.capabilities.contains(&Capability::OnOff) {
            bail!("{:?} device {} must declare on_off", entry.class, entry.id);
        }

        let driver = match entry.driver {
            DriverKind::Simulated => simulated.clone(),
            DriverKind::Bridge => bridge
                .clone()
                .ok_or_else(|| anyhow!("Device {} uses the bridge driver but [bridge] is not configured", entry.id))?,
        };

        let device = Device::new(entry.id.clone(), entry.class, entry.capabilities.iter().copied());
        builder = builder.device(device, driver);
    }

    Ok(builder.build().await?)
}

pub fn create_router(hub: Arc<DeviceHub>, server: &Server) -> Router {
    let device_state = DeviceState { hub: hub.clone() };
    let sse_state = SSEState {
        events: hub.events().clone(),
    };

    Router::new()
        .merge(docs_router())
        .merge(device_router(device_state.clone()))
        .merge(reading_router(device_state.clone()))
        .merge(intent_router(device_state))
        .merge(sse_router(sse_state))
        .layer(cors_layer(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
    }
}

pub async fn create_app(settings: &Arc<Settings>) -> anyhow::Result<(Router, Arc<DeviceHub>)> {
    let hub = Arc::new(build_hub(settings).await?);
    let router = create_router(hub.clone(), &settings.server);

    Ok((router, hub))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER: &str = r#"
        [server]
        host = "127.0.0.1"
        port = 8000

        [logger]
        level = "info"
    "#;

    fn settings(devices: &str) -> Settings {
        Settings::from_toml(&format!("{SERVER}\n{devices}")).unwrap()
    }

    #[tokio::test]
    async fn test_build_hub_from_default_config() {
        let settings = Settings::from_toml(include_str!("../../configs/default.toml")).unwrap();

        let hub = build_hub(&settings).await.unwrap();

        assert_eq!(hub.registry().len().await, 10);
    }

    #[tokio::test]
    async fn test_duplicate_device_is_fatal() {
        let settings = settings(
            r#"
            [[devices]]
            id = "main_outlet"
            class = "outlet"
            capabilities = ["on_off"]

            [[devices]]
            id = "main_outlet"
            class = "outlet"
            capabilities = ["on_off"]
            "#,
        );

        let error = build_hub(&settings).await.err().unwrap();

        assert!(error.to_string().contains("main_outlet"));
    }

    #[tokio::test]
    async fn test_actuator_requires_on_off() {
        let settings = settings(
            r#"
            [[devices]]
            id = "kitchen"
            class = "light"
            capabilities = ["light"]
            "#,
        );

        assert!(build_hub(&settings).await.is_err());
    }

    #[tokio::test]
    async fn test_bridge_binding_requires_bridge_section() {
        let settings = settings(
            r#"
            [[devices]]
            id = "kitchen_outlet"
            class = "outlet"
            capabilities = ["on_off"]
            driver = "bridge"
            "#,
        );

        let error = build_hub(&settings).await.err().unwrap();

        assert!(error.to_string().contains("bridge"));
    }
}
