/// Radio role currently configured on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    ApOnly,
    StaOnly,
    ApSta,
}

/// Lifecycle phase of the station link.
///
/// `Failed` is terminal for the retry loop: the caller observes it and
/// decides whether to start the fallback hotspot instead of retrying
/// indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    Idle,
    Connecting,
    Retrying,
    Connected,
    Failed,
    SoftAp,
}

/// Snapshot of the link, published through a watch channel.
///
/// Mutated only by the connectivity manager's supervisor; read by the other
/// components. `retry_count` resets to 0 on every successful address
/// acquisition and is incremented only while disconnected.
#[derive(Debug, Clone)]
pub struct LinkState {
    pub mode: WifiMode,
    pub phase: LinkPhase,
    pub retry_count: u32,
    pub connected: bool,
    pub internet_reachable: bool,
}

impl LinkState {
    pub(crate) fn new() -> Self {
        Self {
            mode: WifiMode::StaOnly,
            phase: LinkPhase::Idle,
            retry_count: 0,
            connected: false,
            internet_reachable: false,
        }
    }
}

/// Typed events posted by the WiFi driver onto the manager's event channel.
///
/// The driver never mutates link state itself; the supervisor task is the
/// only consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Station association dropped (or never completed).
    Disconnected,
    /// Address acquisition finished; the link is usable.
    AddressAcquired,
    /// A previously acquired address was lost.
    AddressLost,
}

/// Station credentials loaded from the config store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationCredentials {
    pub ssid: String,
    pub passphrase: String,
}

/// Access point security mode. An empty configured passphrase yields an
/// open network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApSecurity {
    Open,
    Wpa2(String),
}

/// Fallback hotspot configuration handed to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPointConfig {
    pub ssid: String,
    pub security: ApSecurity,
    pub max_connections: u8,
}
