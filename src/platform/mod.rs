//! Host adapters for the platform seams (radio driver, device control).

pub mod host;

pub use host::{HostDevice, HostWifiDriver};
