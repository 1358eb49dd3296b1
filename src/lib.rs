//! # Homepost
//!
//! `homepost` is the control plane of a small always-on home node: it keeps
//! the network link up, ships telemetry to an MQTT broker, and keeps the
//! firmware current from GitHub releases.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `connectivity`: Owns the network link (station retries, fallback hotspot, reachability).
//! - `telemetry`: The bounded publish queue and its single publishing worker.
//! - `producers`: Turns external signals (phone presence) into telemetry messages.
//! - `update`: Checks the release feed and sequences the quiesce/flash/restart update.
//! - `storage`: The persistent key/value store for credentials and preserved settings.
//! - `config`: Handles loading and managing application configuration.
//! - `platform`: Host adapters for the radio-driver and device-control seams.
//! - `utils`: Contains shared utilities, such as logging and error handling.

pub mod config;
pub mod connectivity;
pub mod platform;
pub mod producers;
pub mod storage;
pub mod telemetry;
pub mod update;
pub mod utils;
