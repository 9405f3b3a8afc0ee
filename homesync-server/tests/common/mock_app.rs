use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use homesync_server::app::create_router;
use homesync_server::configs::settings::Server;
use homesync_server::models::Device;
use homesync_server::services::{DeviceHub, StalenessPolicy};
use homesync_server::tests::{ScriptedDriver, create_test_hub, environment_sensor, light, motion_sensor, outlet};

pub struct MockApp {
    pub driver: Arc<ScriptedDriver>,
    pub hub: Arc<DeviceHub>,
    pub router: Router,
}

impl MockApp {
    /// Home with one environment sensor, one motion sensor, a light and an
    /// outlet, readings considered fresh for ten seconds.
    pub async fn new() -> Self {
        Self::with_devices(
            vec![
                environment_sensor("environment"),
                motion_sensor("motion"),
                light("living_room"),
                outlet("main_outlet"),
            ],
            StalenessPolicy::new(Duration::from_secs(10)),
            true,
        )
        .await
    }

    pub async fn without_mock() -> Self {
        Self::with_devices(
            vec![environment_sensor("environment"), outlet("main_outlet")],
            StalenessPolicy::new(Duration::from_secs(10)),
            false,
        )
        .await
    }

    pub async fn with_devices(devices: Vec<Device>, staleness: StalenessPolicy, with_mock: bool) -> Self {
        let driver = Arc::new(ScriptedDriver::new());
        let hub = Arc::new(create_test_hub(driver.clone(), devices, staleness, with_mock).await);

        let server = Server {
            host: String::from("127.0.0.1"),
            port: 0,
            cors_origins: Vec::new(),
        };
        let router = create_router(hub.clone(), &server);

        Self { driver, hub, router }
    }
}
