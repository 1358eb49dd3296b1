use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::TelemetrySettings;
use crate::connectivity::link::LinkState;
use crate::storage::{ConfigStore, keys};
use crate::telemetry::broker::{BrokerClient, BrokerEvent, BrokerSession, PublishOutcome};
use crate::telemetry::message::{OutboundMessage, QoS};
use crate::telemetry::session::ConnectionSession;
use crate::update::orchestrator::Quiesce;
use crate::utils::error::{PipelineError, StorageError};

/// Producer-facing side of the pipeline: a non-blocking enqueue. Producers
/// are expected to drop-and-log on failure, never retry synchronously.
pub trait TelemetrySink: Send + Sync {
    fn enqueue(&self, message: OutboundMessage) -> Result<(), PipelineError>;
}

/// Resolves the base topic prefix: the preserved store value when present,
/// otherwise the configured default.
pub fn base_topic(store: &ConfigStore, default_prefix: &str) -> Result<String, StorageError> {
    match store.get(keys::MQTT_TOPIC)? {
        Some(prefix) => Ok(prefix),
        None => Ok(default_prefix.to_string()),
    }
}

struct Running {
    queue_tx: mpsc::Sender<OutboundMessage>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

/// The telemetry publish pipeline: a bounded FIFO of outbound messages and
/// one dedicated publishing worker.
///
/// `start`/`stop` are explicit lifecycle methods; at most one worker runs at
/// a time. Stopping cancels the worker at its next suspension point, so at
/// most one unacknowledged QoS-1 message may be lost on stop.
pub struct PublishPipeline {
    broker: Arc<dyn BrokerClient>,
    store: ConfigStore,
    link: watch::Receiver<LinkState>,
    settings: TelemetrySettings,
    firmware_version: String,
    /// Serializes start/stop so two workers can never run concurrently.
    lifecycle: tokio::sync::Mutex<()>,
    running: Mutex<Option<Running>>,
}

impl PublishPipeline {
    pub fn new(
        broker: Arc<dyn BrokerClient>,
        store: ConfigStore,
        link: watch::Receiver<LinkState>,
        settings: TelemetrySettings,
        firmware_version: &str,
    ) -> Self {
        Self {
            broker,
            store,
            link,
            settings,
            firmware_version: firmware_version.to_string(),
            lifecycle: tokio::sync::Mutex::new(()),
            running: Mutex::new(None),
        }
    }

    /// Starts the pipeline. If an instance is already running it is stopped
    /// and recreated first. Fails fast, with no retry, when any broker
    /// credential is absent from the config store: no worker or session is
    /// created in that case.
    pub async fn start(&self) -> Result<(), PipelineError> {
        let _guard = self.lifecycle.lock().await;

        // Take the slot before awaiting: the guard must not live across a
        // suspension point.
        let prior = self.running.lock().unwrap().take();
        if let Some(prior) = prior {
            warn!("publish pipeline already running, stopping it first");
            shutdown(prior).await;
        }

        let session = ConnectionSession::load(&self.store)?;
        let topic_prefix = base_topic(&self.store, &self.settings.topic_prefix)?;

        let (queue_tx, queue_rx) = mpsc::channel(self.settings.queue_capacity);
        let cancel = CancellationToken::new();
        let worker = Worker {
            broker: Arc::clone(&self.broker),
            session_config: session,
            link: self.link.clone(),
            queue: queue_rx,
            cancel: cancel.clone(),
            topic_prefix,
            firmware_version: self.firmware_version.clone(),
        };
        let handle = tokio::spawn(worker.run());

        *self.running.lock().unwrap() = Some(Running {
            queue_tx,
            cancel,
            worker: handle,
        });
        info!("publish pipeline started");
        Ok(())
    }

    /// Stops the pipeline: cancels the worker, waits for it to tear down the
    /// broker session (disconnect before destroy) and drain the queue. Safe
    /// to call when the pipeline was never started.
    pub async fn stop(&self) {
        let _guard = self.lifecycle.lock().await;
        let prior = self.running.lock().unwrap().take();
        match prior {
            Some(running) => {
                shutdown(running).await;
                info!("publish pipeline stopped");
            }
            None => debug!("publish pipeline was not running"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().unwrap().is_some()
    }

    /// Non-blocking enqueue. Fails when the pipeline is not running or the
    /// queue is full; the message is dropped, never partially written.
    pub fn enqueue(&self, message: OutboundMessage) -> Result<(), PipelineError> {
        let guard = self.running.lock().unwrap();
        let Some(running) = guard.as_ref() else {
            return Err(PipelineError::NotRunning);
        };
        running.queue_tx.try_send(message).map_err(|err| match err {
            TrySendError::Full(_) => PipelineError::QueueFull,
            TrySendError::Closed(_) => PipelineError::NotRunning,
        })
    }
}

impl TelemetrySink for PublishPipeline {
    fn enqueue(&self, message: OutboundMessage) -> Result<(), PipelineError> {
        PublishPipeline::enqueue(self, message)
    }
}

impl Quiesce for PublishPipeline {
    fn stop(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move { PublishPipeline::stop(self).await })
    }

    fn start(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Err(err) = PublishPipeline::start(self).await {
                error!("failed to restart publish pipeline: {err}");
            }
        })
    }
}

async fn shutdown(running: Running) {
    running.cancel.cancel();
    drop(running.queue_tx);
    if let Err(err) = running.worker.await {
        error!("publish worker join failed: {err}");
    }
}

/// The single publishing worker. Suspends on: link connected, queue
/// non-empty, and (QoS 1 only) publish confirmed.
struct Worker {
    broker: Arc<dyn BrokerClient>,
    session_config: ConnectionSession,
    link: watch::Receiver<LinkState>,
    queue: mpsc::Receiver<OutboundMessage>,
    cancel: CancellationToken,
    topic_prefix: String,
    firmware_version: String,
}

impl Worker {
    async fn run(mut self) {
        let (event_tx, mut events) = mpsc::unbounded_channel();

        if !wait_link_up(&mut self.link, &self.cancel).await {
            drain(&mut self.queue);
            return;
        }

        let session = match self.broker.connect(&self.session_config, event_tx).await {
            Ok(session) => session,
            Err(err) => {
                error!("broker connection failed: {err}");
                drain(&mut self.queue);
                return;
            }
        };

        let mut connected = false;
        if !wait_broker_connected(&mut events, &self.cancel, &mut connected).await {
            teardown(session, &mut self.queue).await;
            return;
        }
        info!("broker session connected");

        // Announce the running firmware version once, before steady state.
        if !self
            .announce_version(session.as_ref(), &mut events, &mut connected)
            .await
        {
            teardown(session, &mut self.queue).await;
            return;
        }

        loop {
            // Fold in broker events that arrived while publishing.
            while let Ok(event) = events.try_recv() {
                apply_event(event, &mut connected);
            }

            if !wait_link_up(&mut self.link, &self.cancel).await {
                break;
            }
            if !connected
                && !wait_broker_connected(&mut events, &self.cancel, &mut connected).await
            {
                break;
            }

            let message = tokio::select! {
                _ = self.cancel.cancelled() => break,
                received = self.queue.recv() => match received {
                    Some(message) => message,
                    None => break,
                },
            };

            info!(topic = %message.topic, "publishing message");
            match session.publish(&message).await {
                Err(err) => {
                    // Local publish failure: log, discard, keep going.
                    error!(topic = %message.topic, "failed to publish message: {err}");
                }
                Ok(PublishOutcome::Accepted) => {
                    debug!("message with fire-and-forget qos published without confirmation");
                }
                Ok(PublishOutcome::InFlight(id)) => {
                    debug!(id, "message routed to publishing");
                    if !wait_publish_ack(&mut events, &self.cancel, &mut connected).await {
                        break;
                    }
                    debug!(topic = %message.topic, "message published successfully");
                }
            }
        }

        teardown(session, &mut self.queue).await;
    }

    async fn announce_version(
        &mut self,
        session: &dyn BrokerSession,
        events: &mut mpsc::UnboundedReceiver<BrokerEvent>,
        connected: &mut bool,
    ) -> bool {
        let message = OutboundMessage::new(
            format!("{}/homepost_version", self.topic_prefix),
            serde_json::json!({ "version": self.firmware_version }).to_string(),
            QoS::AtLeastOnce,
        );
        info!(version = %self.firmware_version, "publishing firmware version");
        match session.publish(&message).await {
            Err(err) => {
                error!("failed to publish version announcement: {err}");
                true
            }
            Ok(PublishOutcome::Accepted) => true,
            Ok(PublishOutcome::InFlight(_)) => {
                wait_publish_ack(events, &self.cancel, connected).await
            }
        }
    }
}

/// Applies one broker event to the worker's connected flag; returns the
/// packet id when the event confirms a publish.
fn apply_event(event: BrokerEvent, connected: &mut bool) -> Option<u16> {
    match event {
        BrokerEvent::Connected => {
            *connected = true;
            None
        }
        BrokerEvent::Disconnected => {
            info!("broker disconnected");
            *connected = false;
            None
        }
        BrokerEvent::PublishAcked(id) => Some(id),
        BrokerEvent::ConnectionError(reason) => {
            // Observed but not acted on: reconnection is owned by whatever
            // re-invokes start().
            error!(%reason, "broker connection error");
            None
        }
    }
}

async fn wait_link_up(link: &mut watch::Receiver<LinkState>, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        result = link.wait_for(|state| state.connected) => result.is_ok(),
    }
}

async fn wait_broker_connected(
    events: &mut mpsc::UnboundedReceiver<BrokerEvent>,
    cancel: &CancellationToken,
    connected: &mut bool,
) -> bool {
    while !*connected {
        let event = tokio::select! {
            _ = cancel.cancelled() => return false,
            event = events.recv() => match event {
                Some(event) => event,
                None => return false,
            },
        };
        apply_event(event, connected);
    }
    true
}

/// Blocks until the next publish confirmation. With at most one publish in
/// flight, any ack confirms it; the id is not matched.
async fn wait_publish_ack(
    events: &mut mpsc::UnboundedReceiver<BrokerEvent>,
    cancel: &CancellationToken,
    connected: &mut bool,
) -> bool {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return false,
            event = events.recv() => match event {
                Some(event) => event,
                None => return false,
            },
        };
        if apply_event(event, connected).is_some() {
            return true;
        }
    }
}

fn drain(queue: &mut mpsc::Receiver<OutboundMessage>) {
    queue.close();
    let mut discarded = 0usize;
    while queue.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        debug!(discarded, "discarded queued messages");
    }
}

async fn teardown(session: Box<dyn BrokerSession>, queue: &mut mpsc::Receiver<OutboundMessage>) {
    session.disconnect().await;
    drain(queue);
}
