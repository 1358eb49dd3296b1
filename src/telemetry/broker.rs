use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

use crate::telemetry::message::OutboundMessage;
use crate::telemetry::session::ConnectionSession;
use crate::utils::error::BrokerError;

/// Typed events posted by the broker transport onto the pipeline's event
/// channel. The publishing worker is the only consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    Connected,
    Disconnected,
    /// A QoS-1 publish was confirmed by the broker.
    PublishAcked(u16),
    /// A transport-level error. The worker logs it but does not act on it;
    /// recovery belongs to whatever re-invokes `start()`.
    ConnectionError(String),
}

/// Result of handing a message to the broker publish primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Accepted without confirmation (fire-and-forget QoS).
    Accepted,
    /// Routed for delivery; a [`BrokerEvent::PublishAcked`] will follow.
    InFlight(u16),
}

/// An established broker session. Teardown order is disconnect first, then
/// drop (destroy).
pub trait BrokerSession: Send + Sync {
    fn publish<'a>(
        &'a self,
        message: &'a OutboundMessage,
    ) -> BoxFuture<'a, Result<PublishOutcome, BrokerError>>;

    fn disconnect(&self) -> BoxFuture<'_, ()>;
}

/// Factory for broker sessions. The broker protocol itself is an external
/// library service; the pipeline only sequences it.
pub trait BrokerClient: Send + Sync + 'static {
    fn connect<'a>(
        &'a self,
        session: &'a ConnectionSession,
        events: mpsc::UnboundedSender<BrokerEvent>,
    ) -> BoxFuture<'a, Result<Box<dyn BrokerSession>, BrokerError>>;
}
