use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::connectivity::link::{AccessPointConfig, LinkEvent, StationCredentials};
use crate::connectivity::manager::{DeviceControl, WifiDriver};

/// Host stand-in for the radio driver.
///
/// There is no radio to associate with, so a connect request immediately
/// reports an acquired address; the host's own networking is assumed up.
pub struct HostWifiDriver {
    events: mpsc::UnboundedSender<LinkEvent>,
}

impl HostWifiDriver {
    pub fn new(events: mpsc::UnboundedSender<LinkEvent>) -> Self {
        Self { events }
    }
}

impl WifiDriver for HostWifiDriver {
    fn connect(&self, credentials: &StationCredentials) {
        info!(ssid = %credentials.ssid, "host driver: treating station link as up");
        if self.events.send(LinkEvent::AddressAcquired).is_err() {
            warn!("link supervisor is gone, dropping address event");
        }
    }

    fn start_access_point(&self, config: &AccessPointConfig) {
        warn!(ssid = %config.ssid, "host driver cannot start an access point, ignoring");
    }

    fn link_quality_ok(&self) -> bool {
        true
    }
}

/// Host stand-in for device control: restart means exiting the process and
/// letting the supervisor (systemd, a shell loop) bring it back up.
pub struct HostDevice;

impl DeviceControl for HostDevice {
    fn restart(&self) {
        warn!("restart requested, exiting process");
        std::process::exit(1);
    }
}
