//! The `error` module defines the error types used within the `homepost`
//! application.
//!
//! This module centralizes error handling, providing a consistent way to
//! represent and propagate errors throughout the system. The taxonomy
//! follows the components: storage, link, broker, pipeline, update.

use thiserror::Error;

/// Errors raised by the persistent config store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("stored value for {0} is not valid")]
    InvalidValue(String),
}

/// Errors raised by the connectivity manager.
#[derive(Debug, Error)]
pub enum LinkError {
    /// No WiFi credentials preserved in storage. Connecting without them is
    /// never attempted.
    #[error("wifi credentials missing from storage")]
    MissingCredentials,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors raised by a broker session.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker connection failed: {0}")]
    Connect(String),

    #[error("publish failed: {0}")]
    Publish(String),
}

/// Errors raised by the telemetry publish pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required broker credential is absent from the config store. The
    /// pipeline fails fast and never attempts a partial connection.
    #[error("missing broker credential: {0}")]
    MissingCredential(&'static str),

    #[error("publish pipeline is not running")]
    NotRunning,

    #[error("publish queue is full")]
    QueueFull,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Errors raised by the update orchestrator and its collaborators.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("invalid release tag: {0}")]
    InvalidTag(String),

    #[error("firmware asset not found: {0}")]
    AssetNotFound(String),

    #[error("release feed request failed: {0}")]
    Feed(String),

    #[error("firmware download failed: {0}")]
    Download(String),

    #[error("update orchestrator is not running")]
    NotRunning,
}
