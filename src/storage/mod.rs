//! The `storage` module provides the persistent key/value config store.
//!
//! Broker credentials, WiFi credentials, and the topic prefix survive power
//! loss here. Every operation is a self-contained call on a thread-safe
//! handle, so components may read and write concurrently without holding
//! anything across a suspension point.
//!
//! It uses `sled` as the embedded key-value store.

pub mod store;

pub use store::{ConfigStore, keys};

#[cfg(test)]
mod tests;
