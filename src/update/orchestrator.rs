use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::UpdateSettings;
use crate::connectivity::manager::DeviceControl;
use crate::update::release::{ReleaseInfo, ReleaseResponse, find_firmware_asset, firmware_asset_name};
use crate::update::version::{Version, parse_tag};
use crate::utils::error::UpdateError;

/// How often reachability is re-probed while waiting for internet.
const REACHABILITY_POLL: Duration = Duration::from_secs(5);

/// Remote release feed. The HTTP plumbing is an external service; the
/// orchestrator only sequences it.
pub trait ReleaseFeed: Send + Sync + 'static {
    fn latest_release(&self) -> BoxFuture<'_, Result<ReleaseResponse, UpdateError>>;
}

/// Streams a firmware image into the next boot partition. The atomic
/// dual-partition swap is the platform's job; a successful return is the
/// commit point.
pub trait FirmwareWriter: Send + Sync + 'static {
    fn download_and_flash<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), UpdateError>>;
}

/// A component the orchestrator pauses around a firmware flash and resumes
/// afterwards. Both calls are synchronous in effect: they complete before
/// the orchestrator proceeds.
pub trait Quiesce: Send + Sync + 'static {
    fn stop(&self) -> BoxFuture<'_, ()>;
    fn start(&self) -> BoxFuture<'_, ()>;
}

/// Internet-reachability predicate, provided by the connectivity manager.
pub trait Reachability: Send + Sync + 'static {
    fn is_internet_reachable(&self) -> bool;
}

struct RunningTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodically and on demand checks the release feed and performs the
/// quiesce → download-and-flash → restart sequence.
///
/// The orchestrator's own loop is the sole driver: only one check/update
/// sequence runs at a time.
pub struct UpdateOrchestrator {
    feed: Arc<dyn ReleaseFeed>,
    writer: Arc<dyn FirmwareWriter>,
    device: Arc<dyn DeviceControl>,
    reachability: Arc<dyn Reachability>,
    /// Pipeline and telemetry producers, stopped before a flash and
    /// restarted after a failed one.
    targets: Vec<Arc<dyn Quiesce>>,
    settings: UpdateSettings,
    current_version: Version,
    info: Mutex<ReleaseInfo>,
    trigger: Notify,
    lifecycle: tokio::sync::Mutex<()>,
    running: Mutex<Option<RunningTask>>,
}

impl UpdateOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        feed: Arc<dyn ReleaseFeed>,
        writer: Arc<dyn FirmwareWriter>,
        device: Arc<dyn DeviceControl>,
        reachability: Arc<dyn Reachability>,
        targets: Vec<Arc<dyn Quiesce>>,
        settings: UpdateSettings,
        current_version: Version,
    ) -> Self {
        Self {
            feed,
            writer,
            device,
            reachability,
            targets,
            settings,
            current_version,
            info: Mutex::new(ReleaseInfo::new(current_version)),
            trigger: Notify::new(),
            lifecycle: tokio::sync::Mutex::new(()),
            running: Mutex::new(None),
        }
    }

    /// Starts the orchestrator loop. A second call while running is a no-op.
    pub async fn start(self: &Arc<Self>) {
        let _guard = self.lifecycle.lock().await;
        if self.running.lock().unwrap().is_some() {
            warn!("update orchestrator already running");
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(self).run(cancel.clone()));
        *self.running.lock().unwrap() = Some(RunningTask { cancel, handle });
        info!("update orchestrator started");
    }

    /// Stops the orchestrator loop and waits for it to finish.
    pub async fn stop(&self) {
        let _guard = self.lifecycle.lock().await;
        let prior = self.running.lock().unwrap().take();
        if let Some(task) = prior {
            task.cancel.cancel();
            if let Err(err) = task.handle.await {
                error!("update orchestrator join failed: {err}");
            }
            info!("update orchestrator stopped");
        }
    }

    /// Requests an immediate check. The orchestrator still waits for
    /// internet reachability before checking.
    pub fn check_now(&self) -> Result<(), UpdateError> {
        if self.running.lock().unwrap().is_none() {
            return Err(UpdateError::NotRunning);
        }
        self.trigger.notify_one();
        Ok(())
    }

    /// Snapshot of the current update availability.
    pub fn release_info(&self) -> ReleaseInfo {
        self.info.lock().unwrap().clone()
    }

    pub fn current_version(&self) -> Version {
        self.current_version
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            delay_secs = self.settings.initial_delay_secs,
            "update orchestrator waiting initial delay"
        );
        if !sleep_or_cancel(&cancel, Duration::from_secs(self.settings.initial_delay_secs)).await {
            return;
        }

        loop {
            while !self.reachability.is_internet_reachable() {
                debug!("waiting for internet connection");
                if !sleep_or_cancel(&cancel, REACHABILITY_POLL).await {
                    return;
                }
            }

            match self.check_for_update().await {
                Ok(true) => self.perform_update(&cancel).await,
                Ok(false) => {}
                Err(err) => warn!("update check failed: {err}"),
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(Duration::from_secs(self.settings.check_interval_secs)) => {}
                _ = self.trigger.notified() => {
                    info!("manual update check triggered");
                }
            }
        }
    }

    /// Fetches the latest release and compares it with the running version.
    /// Returns whether an update is available. A transient feed failure
    /// leaves the recorded availability untouched.
    pub async fn check_for_update(&self) -> Result<bool, UpdateError> {
        info!("checking for updates");
        let release = self.feed.latest_release().await?;
        let remote = parse_tag(&release.tag_name)?;
        info!(current = %self.current_version, latest = %remote, "release feed checked");

        if remote > self.current_version {
            let asset = find_firmware_asset(&release.assets, &remote)
                .ok_or_else(|| UpdateError::AssetNotFound(firmware_asset_name(&remote)))?;
            info!(version = %remote, "new version available");
            self.info
                .lock()
                .unwrap()
                .record_available(remote, asset.browser_download_url.clone());
            Ok(true)
        } else {
            info!("firmware is up to date");
            self.info.lock().unwrap().clear();
            Ok(false)
        }
    }

    async fn perform_update(&self, cancel: &CancellationToken) {
        let url = self.info.lock().unwrap().download_url.clone();
        let Some(url) = url else {
            error!("no download url recorded for available update");
            return;
        };

        info!(%url, "starting firmware update");
        info!("stopping telemetry producers and publish pipeline");
        for target in &self.targets {
            target.stop().await;
        }

        // Settle delay: let in-flight work finish and memory free up before
        // the download starts.
        if !sleep_or_cancel(cancel, Duration::from_secs(self.settings.settle_delay_secs)).await {
            self.resume_targets().await;
            return;
        }

        match self.writer.download_and_flash(&url).await {
            Ok(()) => {
                // The swap is committed; nothing left to clean up.
                info!("firmware update successful, restarting");
                self.device.restart();
            }
            Err(err) => {
                error!("firmware update failed: {err}");
                // update_available stays set so the next cycle can retry.
                self.resume_targets().await;
            }
        }
    }

    async fn resume_targets(&self) {
        info!("restarting telemetry producers and publish pipeline");
        for target in &self.targets {
            target.start().await;
        }
    }
}

/// Sleeps for `duration` unless cancelled first; returns false on
/// cancellation.
async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
