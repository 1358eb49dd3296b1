mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{
    LogSettings, PresenceSettings, Settings, StorageSettings, TelemetrySettings, UpdateSettings,
    WifiSettings,
};

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing all component configurations
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::with_prefix("HOMEPOST").separator("__"));

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    Ok(merge(partial, Settings::default()))
}

fn merge(partial: PartialSettings, default: Settings) -> Settings {
    Settings {
        log: LogSettings {
            level: partial
                .log
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.log.level),
        },
        storage: StorageSettings {
            path: partial
                .storage
                .as_ref()
                .and_then(|s| s.path.clone())
                .unwrap_or(default.storage.path),
        },
        wifi: WifiSettings {
            softap_ssid: partial
                .wifi
                .as_ref()
                .and_then(|w| w.softap_ssid.clone())
                .unwrap_or(default.wifi.softap_ssid),
            softap_passphrase: partial
                .wifi
                .as_ref()
                .and_then(|w| w.softap_passphrase.clone())
                .unwrap_or(default.wifi.softap_passphrase),
            max_retries: partial
                .wifi
                .as_ref()
                .and_then(|w| w.max_retries)
                .unwrap_or(default.wifi.max_retries),
        },
        telemetry: TelemetrySettings {
            queue_capacity: partial
                .telemetry
                .as_ref()
                .and_then(|t| t.queue_capacity)
                .unwrap_or(default.telemetry.queue_capacity),
            topic_prefix: partial
                .telemetry
                .as_ref()
                .and_then(|t| t.topic_prefix.clone())
                .unwrap_or(default.telemetry.topic_prefix),
        },
        presence: PresenceSettings {
            scan_timeout_secs: partial
                .presence
                .as_ref()
                .and_then(|p| p.scan_timeout_secs)
                .unwrap_or(default.presence.scan_timeout_secs),
        },
        update: UpdateSettings {
            github_owner: partial
                .update
                .as_ref()
                .and_then(|u| u.github_owner.clone())
                .unwrap_or(default.update.github_owner),
            github_repo: partial
                .update
                .as_ref()
                .and_then(|u| u.github_repo.clone())
                .unwrap_or(default.update.github_repo),
            initial_delay_secs: partial
                .update
                .as_ref()
                .and_then(|u| u.initial_delay_secs)
                .unwrap_or(default.update.initial_delay_secs),
            check_interval_secs: partial
                .update
                .as_ref()
                .and_then(|u| u.check_interval_secs)
                .unwrap_or(default.update.check_interval_secs),
            settle_delay_secs: partial
                .update
                .as_ref()
                .and_then(|u| u.settle_delay_secs)
                .unwrap_or(default.update.settle_delay_secs),
            firmware_target: partial
                .update
                .as_ref()
                .and_then(|u| u.firmware_target.clone())
                .unwrap_or(default.update.firmware_target),
        },
    }
}
