use sled::Db;
use tracing::info;

use crate::utils::error::StorageError;

/// Well-known keys used by the components.
pub mod keys {
    pub const WIFI_SSID: &str = "wifi_ssid";
    pub const WIFI_PASSPHRASE: &str = "wifi_passphrase";
    pub const MQTT_BROKER: &str = "mqtt_broker";
    pub const MQTT_PORT: &str = "mqtt_port";
    pub const MQTT_USERNAME: &str = "mqtt_username";
    pub const MQTT_PASSWORD: &str = "mqtt_password";
    pub const MQTT_CLIENT_ID: &str = "mqtt_client_id";
    pub const MQTT_TOPIC: &str = "mqtt_topic";
}

/// Persistent key/value store for device configuration.
///
/// Values are bounded-length strings or a 16-bit integer (the broker port).
/// Writes are flushed before returning so a power loss immediately after a
/// `set` does not lose the value.
#[derive(Clone)]
pub struct ConfigStore {
    db: Db,
}

impl ConfigStore {
    /// Opens (or creates) the store at `path`.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        info!(path, "config store opened");
        Ok(Self { db })
    }

    /// Returns true when `key` holds a value.
    pub fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.db.contains_key(key)?)
    }

    /// Reads the string value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.db.get(key)? {
            Some(raw) => {
                let value = String::from_utf8(raw.to_vec())
                    .map_err(|_| StorageError::InvalidValue(key.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Stores `value` under `key` and flushes to disk.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.db.insert(key, value.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    /// Reads a 16-bit integer value (stored as its decimal string).
    pub fn get_u16(&self, key: &str) -> Result<Option<u16>, StorageError> {
        match self.get(key)? {
            Some(raw) => {
                let value = raw
                    .parse::<u16>()
                    .map_err(|_| StorageError::InvalidValue(key.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Stores a 16-bit integer value under `key`.
    pub fn set_u16(&self, key: &str, value: u16) -> Result<(), StorageError> {
        self.set(key, &value.to_string())
    }

    /// Removes `key` and flushes to disk. Removing an absent key is not an
    /// error.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.db.remove(key)?;
        self.db.flush()?;
        Ok(())
    }

    /// Returns true when both halves of the WiFi credentials are preserved.
    pub fn wifi_credentials_preserved(&self) -> Result<bool, StorageError> {
        Ok(self.exists(keys::WIFI_SSID)? && self.exists(keys::WIFI_PASSPHRASE)?)
    }

    /// Stores the WiFi station credentials.
    pub fn save_wifi_credentials(&self, ssid: &str, passphrase: &str) -> Result<(), StorageError> {
        self.set(keys::WIFI_SSID, ssid)?;
        self.set(keys::WIFI_PASSPHRASE, passphrase)?;
        info!("wifi credentials saved");
        Ok(())
    }

    /// Reads the preserved WiFi station credentials as `(ssid, passphrase)`.
    pub fn wifi_credentials(&self) -> Result<(String, String), StorageError> {
        let ssid = self
            .get(keys::WIFI_SSID)?
            .ok_or_else(|| StorageError::NotFound(keys::WIFI_SSID.to_string()))?;
        let passphrase = self
            .get(keys::WIFI_PASSPHRASE)?
            .ok_or_else(|| StorageError::NotFound(keys::WIFI_PASSPHRASE.to_string()))?;
        Ok((ssid, passphrase))
    }

    /// Erases the preserved WiFi credentials. Called when preserved
    /// credentials are presumed invalid.
    pub fn erase_wifi_credentials(&self) -> Result<(), StorageError> {
        self.remove(keys::WIFI_SSID)?;
        self.remove(keys::WIFI_PASSPHRASE)?;
        Ok(())
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore").field("db", &"sled::Db").finish()
    }
}
