use std::path::Path;

use anyhow::{Context, Result};
use temperature_bridge::{
    config::BridgeConfig,
    externals::{host::HostModule, sensor_http::SensorHttpModule},
    internals::core::system::spawn_core_system,
};
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = BridgeConfig::default_path();
    let config = BridgeConfig::load(Path::new(&config_path))
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_max_level(config.logging.level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    tracing::info!("Bridging '{}' at {}.", config.sensor.name, config.sensor.url);

    let SensorHttpModule {
        temperature_service,
    } = SensorHttpModule::initialize(&config.sensor).context("Failed to set up sensor client")?;

    let HostModule {
        notification_adapter,
        read_request_adapter,
        host_handle,
    } = HostModule::initialize(&config.sensor.name);

    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    let _core = spawn_core_system(
        &tracker,
        token.clone(),
        temperature_service,
        notification_adapter,
        read_request_adapter,
        config.sensor.polling_interval(),
    );

    match host_handle.on_demand_read().await {
        Ok(reading) => tracing::info!("Initial temperature: {}", reading.temperature),
        Err(e) => tracing::warn!("Initial temperature read failed. Error: {}", e),
    }

    tokio::select! {
        _ = token.cancelled() => {}
        res = signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::error!("Failed to listen for ctrl_c. Error: {}", e);
            }
            token.cancel();
        }
    }

    tracker.close();
    tracker.wait().await;

    Ok(())
}
