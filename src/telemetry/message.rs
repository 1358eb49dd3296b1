/// Delivery guarantee requested for a publish.
///
/// `AtMostOnce` is fire-and-forget; `AtLeastOnce` requires a delivery
/// confirmation before the worker moves to the next message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
}

/// An outbound telemetry message.
///
/// A value type: the producer copies it into the queue and retains no
/// reference after a successful enqueue. The publishing worker consumes and
/// discards it after a confirmed or unconfirmed send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: String,
    pub qos: QoS,
}

impl OutboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>, qos: QoS) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos,
        }
    }
}
