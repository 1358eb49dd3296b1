use std::error::Error;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use homepost::config::{Settings, load_config};
use homepost::connectivity::ConnectivityManager;
use homepost::platform::{HostDevice, HostWifiDriver};
use homepost::producers::PresenceMonitor;
use homepost::storage::ConfigStore;
use homepost::telemetry::rumqtt::RumqttClient;
use homepost::telemetry::{PublishPipeline, base_topic};
use homepost::update::github::{GithubFeed, HttpFirmwareWriter};
use homepost::update::orchestrator::{Quiesce, UpdateOrchestrator};
use homepost::update::version::Version;
use homepost::utils::logging;

#[tokio::main]
async fn main() {
    let settings = match load_config() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };
    logging::init(&settings.log.level);

    if let Err(err) = run(settings).await {
        error!("homepost failed: {err}");
        std::process::exit(1);
    }
}

async fn run(settings: Settings) -> Result<(), Box<dyn Error>> {
    let store = ConfigStore::open(&settings.storage.path)?;

    let (link_events, link_events_rx) = mpsc::unbounded_channel();
    let driver = Arc::new(HostWifiDriver::new(link_events));
    let device = Arc::new(HostDevice);
    let connectivity = Arc::new(ConnectivityManager::new(
        driver,
        device.clone(),
        store.clone(),
        settings.wifi.clone(),
        link_events_rx,
    ));

    let firmware_version = env!("CARGO_PKG_VERSION");
    let pipeline = Arc::new(PublishPipeline::new(
        Arc::new(RumqttClient::new()),
        store.clone(),
        connectivity.state(),
        settings.telemetry.clone(),
        firmware_version,
    ));
    let topic_prefix = base_topic(&store, &settings.telemetry.topic_prefix)?;
    let presence = Arc::new(PresenceMonitor::new(
        pipeline.clone(),
        &topic_prefix,
        &settings.presence,
    ));

    if store.wifi_credentials_preserved()? {
        if connectivity.connect_station(false).await? {
            pipeline.start().await?;
            presence.start().await;
        } else {
            warn!("station connect failed, opening configuration hotspot");
            connectivity.start_fallback_hotspot();
        }
    } else {
        info!("no wifi credentials preserved, opening configuration hotspot");
        connectivity.start_fallback_hotspot();
    }

    let feed = Arc::new(GithubFeed::new(
        &settings.update.github_owner,
        &settings.update.github_repo,
    )?);
    let writer = Arc::new(HttpFirmwareWriter::new(&settings.update.firmware_target)?);
    let current_version: Version = firmware_version.parse()?;
    let targets: Vec<Arc<dyn Quiesce>> = vec![pipeline.clone(), presence.clone()];
    let orchestrator = Arc::new(UpdateOrchestrator::new(
        feed,
        writer,
        device,
        connectivity.clone(),
        targets,
        settings.update.clone(),
        current_version,
    ));
    orchestrator.start().await;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully.");

    orchestrator.stop().await;
    presence.stop().await;
    pipeline.stop().await;

    Ok(())
}
