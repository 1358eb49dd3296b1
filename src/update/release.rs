use serde::Deserialize;

use crate::update::version::Version;

/// One downloadable asset attached to a release.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// The latest-release document served by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseResponse {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

const FIRMWARE_ASSET_PREFIX: &str = "homepost-";
const FIRMWARE_ASSET_SUFFIX: &str = ".bin";

/// The exact asset file name expected for `version`.
pub fn firmware_asset_name(version: &Version) -> String {
    format!("{FIRMWARE_ASSET_PREFIX}{version}{FIRMWARE_ASSET_SUFFIX}")
}

/// Finds the firmware asset for `version` by exact name match.
pub fn find_firmware_asset<'a>(
    assets: &'a [ReleaseAsset],
    version: &Version,
) -> Option<&'a ReleaseAsset> {
    let expected = firmware_asset_name(version);
    assets.iter().find(|asset| asset.name == expected)
}

/// Update availability, readable by any status reporter.
///
/// `available_version` and `download_url` are cleared together whenever a
/// check finds no newer release, so a stale URL can never trigger a
/// download after a transient failure.
#[derive(Debug, Clone)]
pub struct ReleaseInfo {
    pub current_version: Version,
    pub available_version: Option<Version>,
    pub download_url: Option<String>,
    pub update_available: bool,
}

impl ReleaseInfo {
    pub fn new(current_version: Version) -> Self {
        Self {
            current_version,
            available_version: None,
            download_url: None,
            update_available: false,
        }
    }

    pub(crate) fn record_available(&mut self, version: Version, url: String) {
        self.available_version = Some(version);
        self.download_url = Some(url);
        self.update_available = true;
    }

    pub(crate) fn clear(&mut self) {
        self.available_version = None;
        self.download_url = None;
        self.update_available = false;
    }
}
