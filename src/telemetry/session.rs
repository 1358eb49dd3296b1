use crate::storage::{ConfigStore, keys};
use crate::utils::error::{PipelineError, StorageError};

/// Broker connection parameters, loaded once from the config store when the
/// pipeline starts.
///
/// A session with any required credential missing is simply never started:
/// [`ConnectionSession::load`] fails fast instead of attempting a connection
/// with partial credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSession {
    pub broker_host: String,
    pub port: u16,
    pub client_id: String,
    pub username: String,
    pub password: String,
}

impl ConnectionSession {
    /// Required config store keys, checked before any value is read.
    const REQUIRED: [&'static str; 5] = [
        keys::MQTT_BROKER,
        keys::MQTT_PORT,
        keys::MQTT_USERNAME,
        keys::MQTT_CLIENT_ID,
        keys::MQTT_PASSWORD,
    ];

    pub fn load(store: &ConfigStore) -> Result<Self, PipelineError> {
        for key in Self::REQUIRED {
            if !store.exists(key)? {
                return Err(PipelineError::MissingCredential(key));
            }
        }

        let broker_host = require(store.get(keys::MQTT_BROKER)?, keys::MQTT_BROKER)?;
        let port = store
            .get_u16(keys::MQTT_PORT)?
            .ok_or_else(|| StorageError::NotFound(keys::MQTT_PORT.to_string()))?;
        let username = require(store.get(keys::MQTT_USERNAME)?, keys::MQTT_USERNAME)?;
        let client_id = require(store.get(keys::MQTT_CLIENT_ID)?, keys::MQTT_CLIENT_ID)?;
        let password = require(store.get(keys::MQTT_PASSWORD)?, keys::MQTT_PASSWORD)?;

        Ok(Self {
            broker_host,
            port,
            client_id,
            username,
            password,
        })
    }

    /// Broker URI in the form the transport expects.
    pub fn uri(&self) -> String {
        format!("mqtt://{}", self.broker_host)
    }
}

fn require(value: Option<String>, key: &str) -> Result<String, PipelineError> {
    value.ok_or_else(|| PipelineError::Storage(StorageError::NotFound(key.to_string())))
}
