use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PresenceSettings;
use crate::telemetry::message::{OutboundMessage, QoS};
use crate::telemetry::pipeline::TelemetrySink;
use crate::update::orchestrator::Quiesce;

struct Running {
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

/// Reports phone presence over telemetry.
///
/// An external scanner calls [`report_sighting`] whenever it sees the phone.
/// Each monitoring cycle waits for a sighting up to the scan timeout and
/// enqueues `<prefix>/phone_present` with the result. Enqueue failures are
/// logged and the reading dropped; the next cycle produces a fresh one.
///
/// [`report_sighting`]: PresenceMonitor::report_sighting
pub struct PresenceMonitor {
    sink: Arc<dyn TelemetrySink>,
    topic: String,
    scan_window: Duration,
    sighting: Arc<Notify>,
    lifecycle: tokio::sync::Mutex<()>,
    running: Mutex<Option<Running>>,
}

impl PresenceMonitor {
    pub fn new(
        sink: Arc<dyn TelemetrySink>,
        topic_prefix: &str,
        settings: &PresenceSettings,
    ) -> Self {
        Self {
            sink,
            topic: format!("{topic_prefix}/phone_present"),
            scan_window: Duration::from_secs(settings.scan_timeout_secs),
            sighting: Arc::new(Notify::new()),
            lifecycle: tokio::sync::Mutex::new(()),
            running: Mutex::new(None),
        }
    }

    /// Records that the phone was seen. Sightings arriving while no cycle is
    /// waiting are coalesced into the next one.
    pub fn report_sighting(&self) {
        self.sighting.notify_one();
    }

    /// Starts the monitoring loop. A second call while running is a no-op.
    pub async fn start(&self) {
        let _guard = self.lifecycle.lock().await;
        if self.running.lock().unwrap().is_some() {
            warn!("presence monitor already running");
            return;
        }

        let cancel = CancellationToken::new();
        let worker = Worker {
            sink: Arc::clone(&self.sink),
            topic: self.topic.clone(),
            scan_window: self.scan_window,
            sighting: Arc::clone(&self.sighting),
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(worker.run());
        *self.running.lock().unwrap() = Some(Running {
            cancel,
            worker: handle,
        });
        info!("presence monitor started");
    }

    /// Stops the monitoring loop and waits for it to finish.
    pub async fn stop(&self) {
        let _guard = self.lifecycle.lock().await;
        let prior = self.running.lock().unwrap().take();
        match prior {
            Some(running) => {
                running.cancel.cancel();
                if let Err(err) = running.worker.await {
                    error!("presence worker join failed: {err}");
                }
                info!("presence monitor stopped");
            }
            None => debug!("presence monitor was not running"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().unwrap().is_some()
    }
}

impl Quiesce for PresenceMonitor {
    fn stop(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move { PresenceMonitor::stop(self).await })
    }

    fn start(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move { PresenceMonitor::start(self).await })
    }
}

struct Worker {
    sink: Arc<dyn TelemetrySink>,
    topic: String,
    scan_window: Duration,
    sighting: Arc<Notify>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        loop {
            let present = tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = self.sighting.notified() => true,
                _ = tokio::time::sleep(self.scan_window) => false,
            };
            self.publish_presence(present);
        }
    }

    fn publish_presence(&self, present: bool) {
        let state = if present { "ON" } else { "OFF" };
        debug!(state, "reporting phone presence");
        let message = OutboundMessage::new(
            self.topic.clone(),
            serde_json::json!({ "state": state }).to_string(),
            QoS::AtMostOnce,
        );
        if let Err(err) = self.sink.enqueue(message) {
            warn!("dropping presence reading: {err}");
        }
    }
}
