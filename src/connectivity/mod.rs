//! The `connectivity` module owns the network link.
//!
//! It decides between station and fallback access-point roles, supervises
//! reconnection up to a configured ceiling, and exposes an
//! internet-reachable predicate that gates network-dependent work in the
//! other components.

pub mod link;
pub mod manager;

pub use link::{AccessPointConfig, ApSecurity, LinkEvent, LinkPhase, LinkState, StationCredentials, WifiMode};
pub use manager::{ConnectivityManager, DeviceControl, WifiDriver};

#[cfg(test)]
mod tests;
