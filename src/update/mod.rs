//! The `update` module keeps the firmware current.
//!
//! An orchestrator task periodically (or on demand) checks a remote release
//! feed, compares semantic versions, and on a newer release quiesces the
//! telemetry components, streams the firmware image to the next boot
//! partition, and restarts the device.

pub mod github;
pub mod orchestrator;
pub mod release;
pub mod version;

pub use github::{GithubFeed, HttpFirmwareWriter};
pub use orchestrator::{FirmwareWriter, Quiesce, Reachability, ReleaseFeed, UpdateOrchestrator};
pub use release::{ReleaseAsset, ReleaseInfo, ReleaseResponse};
pub use version::{Version, parse_tag};
