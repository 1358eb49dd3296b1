use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::config::WifiSettings;
use crate::connectivity::link::{
    AccessPointConfig, ApSecurity, LinkEvent, LinkPhase, LinkState, StationCredentials, WifiMode,
};
use crate::storage::ConfigStore;
use crate::update::orchestrator::Reachability;
use crate::utils::error::{LinkError, StorageError};

/// External radio driver. Association requests are fire-and-forget; their
/// outcomes arrive as [`LinkEvent`]s on the manager's event channel.
pub trait WifiDriver: Send + Sync + 'static {
    /// Begin (or re-attempt) station association with `credentials`.
    fn connect(&self, credentials: &StationCredentials);

    /// Configure and start the access point.
    fn start_access_point(&self, config: &AccessPointConfig);

    /// Live probe of the current link quality.
    fn link_quality_ok(&self) -> bool;
}

/// Device-level control surface. Restart is the only operation the core
/// needs: fatal link states trade availability for a known-clean state.
pub trait DeviceControl: Send + Sync + 'static {
    fn restart(&self);
}

struct Inner {
    state: watch::Sender<LinkState>,
    reachable: AtomicBool,
    /// Set when the current station attempt is a fallback candidate; while
    /// set, retry-ceiling exhaustion must not restart the device.
    fallback_mode: AtomicBool,
    /// Latched at retry-ceiling exhaustion so the terminal failure is raised
    /// exactly once per attempt series. Re-armed by a successful address
    /// acquisition and by each fresh `connect_station` call.
    terminal_raised: AtomicBool,
    credentials: Mutex<Option<StationCredentials>>,
}

/// Owns the network link: station retry policy, fallback hotspot, and the
/// internet-reachability predicate.
///
/// Link events are consumed by a single supervisor task; all other state is
/// published through a watch channel plus one atomic for the lock-free
/// reachability read.
pub struct ConnectivityManager {
    driver: Arc<dyn WifiDriver>,
    inner: Arc<Inner>,
    settings: WifiSettings,
    store: ConfigStore,
    ap_started: AtomicBool,
}

impl ConnectivityManager {
    /// Creates the manager and spawns its supervisor task consuming
    /// `events`. Must be called within a tokio runtime.
    pub fn new(
        driver: Arc<dyn WifiDriver>,
        device: Arc<dyn DeviceControl>,
        store: ConfigStore,
        settings: WifiSettings,
        events: mpsc::UnboundedReceiver<LinkEvent>,
    ) -> Self {
        let (state_tx, _state_rx) = watch::channel(LinkState::new());
        let inner = Arc::new(Inner {
            state: state_tx,
            reachable: AtomicBool::new(false),
            fallback_mode: AtomicBool::new(false),
            terminal_raised: AtomicBool::new(false),
            credentials: Mutex::new(None),
        });

        tokio::spawn(supervise(
            Arc::clone(&inner),
            Arc::clone(&driver),
            device,
            settings.max_retries,
            events,
        ));

        Self {
            driver,
            inner,
            settings,
            store,
            ap_started: AtomicBool::new(false),
        }
    }

    /// Subscribes to link state snapshots.
    pub fn state(&self) -> watch::Receiver<LinkState> {
        self.inner.state.subscribe()
    }

    /// Current link state snapshot.
    pub fn link_state(&self) -> LinkState {
        self.inner.state.borrow().clone()
    }

    /// Connects to the preserved WiFi network as a station, blocking the
    /// caller until the link either acquires an address or fails
    /// terminally. There is no client-side timeout: supervision happens
    /// through the retry ceiling.
    ///
    /// On terminal failure while `fallback_candidate` is true the preserved
    /// credentials are presumed invalid and erased before returning false.
    pub async fn connect_station(&self, fallback_candidate: bool) -> Result<bool, LinkError> {
        let (ssid, passphrase) = self.store.wifi_credentials().map_err(|err| match err {
            StorageError::NotFound(_) => LinkError::MissingCredentials,
            other => LinkError::Storage(other),
        })?;
        let credentials = StationCredentials { ssid, passphrase };

        self.inner
            .fallback_mode
            .store(fallback_candidate, Ordering::SeqCst);
        *self.inner.credentials.lock().unwrap() = Some(credentials.clone());
        // A fresh attempt series: re-arm the retry ceiling.
        self.inner.terminal_raised.store(false, Ordering::SeqCst);
        self.inner.state.send_modify(|state| {
            state.retry_count = 0;
            state.phase = LinkPhase::Connecting;
            state.mode = WifiMode::ApSta;
        });

        info!(ssid = %credentials.ssid, "connecting to wifi network");
        self.driver.connect(&credentials);

        let mut rx = self.inner.state.subscribe();
        let outcome = rx
            .wait_for(|state| matches!(state.phase, LinkPhase::Connected | LinkPhase::Failed))
            .await;
        let phase = match outcome {
            Ok(state) => state.phase,
            // Supervisor gone; treat as failure.
            Err(_) => return Ok(false),
        };

        if phase == LinkPhase::Connected {
            info!("connected to access point");
            return Ok(true);
        }

        info!("failed to connect to access point");
        if fallback_candidate {
            warn!("preserved credentials considered invalid, erasing");
            self.store.erase_wifi_credentials()?;
        }
        Ok(false)
    }

    /// Starts the fallback configuration hotspot. Idempotent: a second call
    /// is a no-op. Does not block.
    pub fn start_fallback_hotspot(&self) {
        if self.ap_started.swap(true, Ordering::SeqCst) {
            debug!("fallback hotspot already started");
            return;
        }

        let security = if self.settings.softap_passphrase.is_empty() {
            ApSecurity::Open
        } else {
            ApSecurity::Wpa2(self.settings.softap_passphrase.clone())
        };
        let config = AccessPointConfig {
            ssid: self.settings.softap_ssid.clone(),
            security,
            max_connections: 2,
        };

        info!(ssid = %config.ssid, "starting fallback hotspot");
        self.driver.start_access_point(&config);
        self.inner.state.send_modify(|state| {
            state.phase = LinkPhase::SoftAp;
            state.mode = WifiMode::ApSta;
        });
    }

    /// Lock-free read of the reachability flag combined with a live
    /// link-quality probe. Callers must tolerate transient false negatives.
    pub fn is_internet_reachable(&self) -> bool {
        self.inner.reachable.load(Ordering::Relaxed) && self.driver.link_quality_ok()
    }
}

impl Reachability for ConnectivityManager {
    fn is_internet_reachable(&self) -> bool {
        ConnectivityManager::is_internet_reachable(self)
    }
}

/// Supervisor: the only consumer of link events and the only writer of link
/// state.
async fn supervise(
    inner: Arc<Inner>,
    driver: Arc<dyn WifiDriver>,
    device: Arc<dyn DeviceControl>,
    max_retries: u32,
    mut events: mpsc::UnboundedReceiver<LinkEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            LinkEvent::AddressAcquired => {
                inner.reachable.store(true, Ordering::SeqCst);
                inner.terminal_raised.store(false, Ordering::SeqCst);
                inner.state.send_modify(|state| {
                    state.retry_count = 0;
                    state.connected = true;
                    state.internet_reachable = true;
                    state.phase = LinkPhase::Connected;
                });
                info!("got address, station link up");
            }
            LinkEvent::AddressLost => {
                inner.reachable.store(false, Ordering::SeqCst);
                inner.state.send_modify(|state| {
                    state.connected = false;
                    state.internet_reachable = false;
                    state.phase = LinkPhase::Idle;
                });
                // Partially-torn-down network state is riskier than a clean
                // restart.
                warn!("lost acquired address, device will restart now");
                device.restart();
            }
            LinkEvent::Disconnected => {
                if inner.terminal_raised.load(Ordering::SeqCst) {
                    debug!("disconnect after terminal failure, ignoring");
                    continue;
                }

                let retry_count = inner.state.borrow().retry_count;
                if retry_count < max_retries {
                    let credentials = inner.credentials.lock().unwrap().clone();
                    inner.state.send_modify(|state| {
                        state.retry_count += 1;
                        state.connected = false;
                        state.internet_reachable = false;
                        state.phase = LinkPhase::Retrying;
                    });
                    inner.reachable.store(false, Ordering::SeqCst);
                    info!(retry = retry_count + 1, "connection retry");
                    if let Some(credentials) = credentials {
                        driver.connect(&credentials);
                    }
                } else {
                    inner.terminal_raised.store(true, Ordering::SeqCst);
                    inner.reachable.store(false, Ordering::SeqCst);
                    inner.state.send_modify(|state| {
                        state.connected = false;
                        state.internet_reachable = false;
                        state.phase = LinkPhase::Failed;
                    });
                    error!(retries = retry_count, "connection failed after retry ceiling");
                    if !inner.fallback_mode.load(Ordering::SeqCst) {
                        warn!("device will restart now");
                        device.restart();
                    }
                }
            }
        }
    }

    debug!("link event channel closed, supervisor exiting");
}
