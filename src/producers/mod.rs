//! Telemetry producers. Each producer turns an external signal into
//! [`crate::telemetry::OutboundMessage`]s and enqueues them without blocking.

pub mod presence;

pub use presence::PresenceMonitor;

#[cfg(test)]
mod tests;
