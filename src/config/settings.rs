use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for logging, the config store location, the WiFi link,
/// the telemetry pipeline, the presence producer, and the update orchestrator.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub log: LogSettings,
    pub storage: StorageSettings,
    pub wifi: WifiSettings,
    pub telemetry: TelemetrySettings,
    pub presence: PresenceSettings,
    pub update: UpdateSettings,
}

/// Logging settings.
#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Config store settings.
///
/// `path` is the on-disk location of the persistent key/value store.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub path: String,
}

/// WiFi link settings.
///
/// `max_retries` is the station reconnection ceiling; once exceeded the
/// connectivity manager raises its terminal failure signal. The SoftAP
/// values configure the fallback hotspot (an empty passphrase means an
/// open network).
#[derive(Debug, Deserialize, Clone)]
pub struct WifiSettings {
    pub softap_ssid: String,
    pub softap_passphrase: String,
    pub max_retries: u32,
}

/// Telemetry pipeline settings.
///
/// `topic_prefix` is the compile-time fallback used when no prefix has been
/// written to the config store. `queue_capacity` bounds the publish queue.
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetrySettings {
    pub queue_capacity: usize,
    pub topic_prefix: String,
}

/// Presence producer settings.
///
/// `scan_timeout_secs` is the window within which a tracker sighting must
/// arrive before the device is reported absent.
#[derive(Debug, Deserialize, Clone)]
pub struct PresenceSettings {
    pub scan_timeout_secs: u64,
}

/// Update orchestrator settings.
#[derive(Debug, Deserialize, Clone)]
pub struct UpdateSettings {
    pub github_owner: String,
    pub github_repo: String,
    pub initial_delay_secs: u64,
    pub check_interval_secs: u64,
    pub settle_delay_secs: u64,
    pub firmware_target: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub log: Option<PartialLogSettings>,
    pub storage: Option<PartialStorageSettings>,
    pub wifi: Option<PartialWifiSettings>,
    pub telemetry: Option<PartialTelemetrySettings>,
    pub presence: Option<PartialPresenceSettings>,
    pub update: Option<PartialUpdateSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialStorageSettings {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialWifiSettings {
    pub softap_ssid: Option<String>,
    pub softap_passphrase: Option<String>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PartialTelemetrySettings {
    pub queue_capacity: Option<usize>,
    pub topic_prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialPresenceSettings {
    pub scan_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialUpdateSettings {
    pub github_owner: Option<String>,
    pub github_repo: Option<String>,
    pub initial_delay_secs: Option<u64>,
    pub check_interval_secs: Option<u64>,
    pub settle_delay_secs: Option<u64>,
    pub firmware_target: Option<String>,
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            log: LogSettings {
                level: "info".to_string(),
            },
            storage: StorageSettings {
                path: "homepost_store".to_string(),
            },
            wifi: WifiSettings {
                softap_ssid: "homepost".to_string(),
                softap_passphrase: String::new(),
                max_retries: 5,
            },
            telemetry: TelemetrySettings {
                queue_capacity: 10,
                topic_prefix: "homepost".to_string(),
            },
            presence: PresenceSettings {
                scan_timeout_secs: 300,
            },
            update: UpdateSettings {
                github_owner: String::new(),
                github_repo: String::new(),
                initial_delay_secs: 30,
                check_interval_secs: 24 * 60 * 60,
                settle_delay_secs: 3,
                firmware_target: "next-boot.bin".to_string(),
            },
        }
    }
}
