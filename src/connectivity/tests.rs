use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::link::{AccessPointConfig, LinkEvent, LinkPhase, StationCredentials};
use super::manager::{ConnectivityManager, DeviceControl, WifiDriver};
use crate::config::WifiSettings;
use crate::storage::ConfigStore;
use crate::utils::error::LinkError;

/// Driver double: counts calls and optionally answers every connect attempt
/// with a scripted event, the way the radio stack answers with callbacks.
struct FakeDriver {
    events: mpsc::UnboundedSender<LinkEvent>,
    on_connect: Option<LinkEvent>,
    connects: AtomicUsize,
    ap_configs: Mutex<Vec<AccessPointConfig>>,
    quality_ok: AtomicBool,
}

impl FakeDriver {
    fn new(events: mpsc::UnboundedSender<LinkEvent>, on_connect: Option<LinkEvent>) -> Self {
        Self {
            events,
            on_connect,
            connects: AtomicUsize::new(0),
            ap_configs: Mutex::new(Vec::new()),
            quality_ok: AtomicBool::new(true),
        }
    }
}

impl WifiDriver for FakeDriver {
    fn connect(&self, _credentials: &StationCredentials) {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(event) = &self.on_connect {
            let _ = self.events.send(event.clone());
        }
    }

    fn start_access_point(&self, config: &AccessPointConfig) {
        self.ap_configs.lock().unwrap().push(config.clone());
    }

    fn link_quality_ok(&self) -> bool {
        self.quality_ok.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct FakeDevice {
    restarts: AtomicUsize,
}

impl DeviceControl for FakeDevice {
    fn restart(&self) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }
}

fn wifi_settings(max_retries: u32) -> WifiSettings {
    WifiSettings {
        softap_ssid: "homepost".to_string(),
        softap_passphrase: String::new(),
        max_retries,
    }
}

struct Fixture {
    manager: ConnectivityManager,
    driver: Arc<FakeDriver>,
    device: Arc<FakeDevice>,
    events: mpsc::UnboundedSender<LinkEvent>,
    store: ConfigStore,
    _dir: tempfile::TempDir,
}

fn fixture(on_connect: Option<LinkEvent>, max_retries: u32, seed_credentials: bool) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::open(dir.path().to_str().unwrap()).unwrap();
    if seed_credentials {
        store.save_wifi_credentials("home-net", "hunter2").unwrap();
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let driver = Arc::new(FakeDriver::new(tx.clone(), on_connect));
    let device = Arc::new(FakeDevice::default());
    let manager = ConnectivityManager::new(
        driver.clone(),
        device.clone(),
        store.clone(),
        wifi_settings(max_retries),
        rx,
    );

    Fixture {
        manager,
        driver,
        device,
        events: tx,
        store,
        _dir: dir,
    }
}

async fn settle() {
    // Let the supervisor drain its event channel.
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn connect_station_succeeds_on_address_acquisition() {
    let fx = fixture(Some(LinkEvent::AddressAcquired), 3, true);
    let connected = fx.manager.connect_station(false).await.unwrap();
    assert!(connected);
    assert_eq!(fx.driver.connects.load(Ordering::SeqCst), 1);

    let state = fx.manager.link_state();
    assert_eq!(state.phase, LinkPhase::Connected);
    assert!(state.connected);
    assert_eq!(state.retry_count, 0);
    assert!(fx.manager.is_internet_reachable());
}

#[tokio::test]
async fn connect_station_without_credentials_fails_fast() {
    let fx = fixture(None, 3, false);
    let err = fx.manager.connect_station(false).await.unwrap_err();
    assert!(matches!(err, LinkError::MissingCredentials));
    assert_eq!(fx.driver.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn retry_ceiling_raises_terminal_failure_exactly_once() {
    let max_retries = 3;
    let fx = fixture(Some(LinkEvent::Disconnected), max_retries, true);

    // Fallback candidate: no restart, so the terminal path is observable.
    let connected = fx.manager.connect_station(true).await.unwrap();
    assert!(!connected);
    // Initial attempt plus one re-attempt per retry below the ceiling.
    assert_eq!(
        fx.driver.connects.load(Ordering::SeqCst),
        1 + max_retries as usize
    );
    assert_eq!(fx.manager.link_state().phase, LinkPhase::Failed);
    assert_eq!(fx.device.restarts.load(Ordering::SeqCst), 0);

    // A further disconnect event after the terminal failure must not raise
    // it again or trigger more retries.
    let connects_before = fx.driver.connects.load(Ordering::SeqCst);
    fx.events.send(LinkEvent::Disconnected).unwrap();
    settle().await;
    assert_eq!(fx.driver.connects.load(Ordering::SeqCst), connects_before);
    assert_eq!(fx.device.restarts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn terminal_failure_erases_credentials_for_fallback_candidate() {
    let fx = fixture(Some(LinkEvent::Disconnected), 1, true);
    let connected = fx.manager.connect_station(true).await.unwrap();
    assert!(!connected);

    // Credentials were presumed invalid and erased.
    let err = fx.manager.connect_station(true).await.unwrap_err();
    assert!(matches!(err, LinkError::MissingCredentials));
}

#[tokio::test]
async fn terminal_failure_restarts_device_when_not_fallback() {
    let fx = fixture(Some(LinkEvent::Disconnected), 1, true);
    let connected = fx.manager.connect_station(false).await.unwrap();
    assert!(!connected);
    settle().await;
    assert_eq!(fx.device.restarts.load(Ordering::SeqCst), 1);

    // Subsequent disconnects must not restart again.
    fx.events.send(LinkEvent::Disconnected).unwrap();
    settle().await;
    assert_eq!(fx.device.restarts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn disconnect_after_recovery_is_supervised_again() {
    let fx = fixture(Some(LinkEvent::Disconnected), 1, true);
    assert!(!fx.manager.connect_station(true).await.unwrap());
    assert_eq!(fx.driver.connects.load(Ordering::SeqCst), 2);

    // The link later comes up; the retry ceiling is re-armed.
    fx.events.send(LinkEvent::AddressAcquired).unwrap();
    settle().await;
    assert!(fx.manager.link_state().connected);
    assert_eq!(fx.manager.link_state().retry_count, 0);

    // A fresh disconnect must be supervised again, not ignored.
    fx.events.send(LinkEvent::Disconnected).unwrap();
    settle().await;
    assert_eq!(fx.driver.connects.load(Ordering::SeqCst), 3);
    let state = fx.manager.link_state();
    assert!(!state.connected);
    assert_eq!(state.phase, LinkPhase::Failed);
    assert_eq!(fx.device.restarts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn connect_station_can_be_attempted_again_after_terminal_failure() {
    let fx = fixture(Some(LinkEvent::Disconnected), 1, true);
    assert!(!fx.manager.connect_station(true).await.unwrap());
    assert_eq!(fx.driver.connects.load(Ordering::SeqCst), 2);

    // New credentials arrive, the way the configuration endpoint writes
    // them. The second attempt must run a full retry series and terminate.
    fx.store.save_wifi_credentials("home-net", "hunter3").unwrap();
    let connected = tokio::time::timeout(
        Duration::from_secs(2),
        fx.manager.connect_station(true),
    )
    .await
    .expect("second attempt must reach a terminal outcome")
    .unwrap();
    assert!(!connected);
    assert_eq!(fx.driver.connects.load(Ordering::SeqCst), 4);
    assert_eq!(fx.manager.link_state().phase, LinkPhase::Failed);
}

#[tokio::test]
async fn address_loss_restarts_unconditionally() {
    let fx = fixture(Some(LinkEvent::AddressAcquired), 3, true);
    assert!(fx.manager.connect_station(false).await.unwrap());

    fx.events.send(LinkEvent::AddressLost).unwrap();
    settle().await;
    assert_eq!(fx.device.restarts.load(Ordering::SeqCst), 1);
    assert!(!fx.manager.is_internet_reachable());
}

#[tokio::test]
async fn fallback_hotspot_is_idempotent() {
    let fx = fixture(None, 3, false);
    fx.manager.start_fallback_hotspot();
    fx.manager.start_fallback_hotspot();

    let configs = fx.driver.ap_configs.lock().unwrap();
    assert_eq!(configs.len(), 1);
    // Empty configured passphrase yields an open network.
    assert_eq!(configs[0].security, super::link::ApSecurity::Open);
    assert_eq!(fx.manager.link_state().phase, LinkPhase::SoftAp);
}

#[tokio::test]
async fn reachability_needs_both_flag_and_link_quality() {
    let fx = fixture(Some(LinkEvent::AddressAcquired), 3, true);
    assert!(fx.manager.connect_station(false).await.unwrap());
    assert!(fx.manager.is_internet_reachable());

    fx.driver.quality_ok.store(false, Ordering::SeqCst);
    assert!(!fx.manager.is_internet_reachable());
}
