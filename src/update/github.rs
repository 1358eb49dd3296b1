//! GitHub-backed release feed and firmware transport.

use std::path::PathBuf;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::update::orchestrator::{FirmwareWriter, ReleaseFeed};
use crate::update::release::ReleaseResponse;
use crate::utils::error::UpdateError;

const FEED_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = "homepost";

/// Fetches `releases/latest` from the GitHub API.
pub struct GithubFeed {
    client: reqwest::Client,
    url: String,
}

impl GithubFeed {
    pub fn new(owner: &str, repo: &str) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .timeout(FEED_TIMEOUT)
            .build()
            .map_err(|err| UpdateError::Feed(err.to_string()))?;
        Ok(Self {
            client,
            url: format!("https://api.github.com/repos/{owner}/{repo}/releases/latest"),
        })
    }
}

impl ReleaseFeed for GithubFeed {
    fn latest_release(&self) -> BoxFuture<'_, Result<ReleaseResponse, UpdateError>> {
        Box::pin(async move {
            info!(url = %self.url, "checking for updates");
            let response = self
                .client
                .get(&self.url)
                .header("Accept", "application/vnd.github.v3+json")
                .header("User-Agent", USER_AGENT)
                .send()
                .await
                .map_err(|err| UpdateError::Feed(err.to_string()))?;

            let status = response.status();
            if status != reqwest::StatusCode::OK {
                return Err(UpdateError::Feed(format!(
                    "release feed returned status {status}"
                )));
            }

            response
                .json::<ReleaseResponse>()
                .await
                .map_err(|err| UpdateError::Feed(err.to_string()))
        })
    }
}

/// Streams a firmware image over HTTPS into the next-boot target.
///
/// The dual-partition bookkeeping belongs to the platform; this writer only
/// moves bytes, chunk by chunk, and syncs before reporting success.
pub struct HttpFirmwareWriter {
    client: reqwest::Client,
    target: PathBuf,
}

impl HttpFirmwareWriter {
    pub fn new(target: impl Into<PathBuf>) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|err| UpdateError::Download(err.to_string()))?;
        Ok(Self {
            client,
            target: target.into(),
        })
    }
}

impl FirmwareWriter for HttpFirmwareWriter {
    fn download_and_flash<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), UpdateError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .header("User-Agent", USER_AGENT)
                .send()
                .await
                .map_err(|err| UpdateError::Download(err.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(UpdateError::Download(format!(
                    "firmware download returned status {status}"
                )));
            }

            let mut file = tokio::fs::File::create(&self.target)
                .await
                .map_err(|err| UpdateError::Download(err.to_string()))?;
            let mut stream = response.bytes_stream();
            let mut written = 0usize;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|err| UpdateError::Download(err.to_string()))?;
                file.write_all(&chunk)
                    .await
                    .map_err(|err| UpdateError::Download(err.to_string()))?;
                written += chunk.len();
            }
            file.sync_all()
                .await
                .map_err(|err| UpdateError::Download(err.to_string()))?;

            info!(bytes = written, target = %self.target.display(), "firmware image written");
            Ok(())
        })
    }
}
