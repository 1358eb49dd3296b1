//! The `telemetry` module decouples message production from network I/O.
//!
//! Producers enqueue [`message::OutboundMessage`]s without blocking; a single
//! publishing worker delivers them to the broker in strict FIFO order, gated
//! on the link being up and, for QoS 1, on a per-publish confirmation.

pub mod broker;
pub mod message;
pub mod pipeline;
pub mod rumqtt;
pub mod session;

pub use broker::{BrokerClient, BrokerEvent, BrokerSession, PublishOutcome};
pub use message::{OutboundMessage, QoS};
pub use pipeline::{PublishPipeline, TelemetrySink, base_topic};
pub use session::ConnectionSession;
