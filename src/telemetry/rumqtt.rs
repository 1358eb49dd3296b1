//! rumqttc-backed broker session.
//!
//! The MQTT protocol state machine lives in `rumqttc`; this adapter only
//! translates its event loop into [`BrokerEvent`]s and enforces the
//! teardown order the pipeline expects. It carries no reconnect policy of
//! its own.

use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use futures_util::future::BoxFuture;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::telemetry::broker::{BrokerClient, BrokerEvent, BrokerSession, PublishOutcome};
use crate::telemetry::message::{OutboundMessage, QoS};
use crate::telemetry::session::ConnectionSession;
use crate::utils::error::BrokerError;

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const CHANNEL_CAPACITY: usize = 10;

pub struct RumqttClient;

impl RumqttClient {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RumqttClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerClient for RumqttClient {
    fn connect<'a>(
        &'a self,
        session: &'a ConnectionSession,
        events: mpsc::UnboundedSender<BrokerEvent>,
    ) -> BoxFuture<'a, Result<Box<dyn BrokerSession>, BrokerError>> {
        Box::pin(async move {
            let mut options = MqttOptions::new(
                session.client_id.clone(),
                session.broker_host.clone(),
                session.port,
            );
            options.set_credentials(session.username.clone(), session.password.clone());
            options.set_keep_alive(KEEP_ALIVE);

            let (client, mut event_loop) = AsyncClient::new(options, CHANNEL_CAPACITY);

            let poller = tokio::spawn(async move {
                loop {
                    match event_loop.poll().await {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            let _ = events.send(BrokerEvent::Connected);
                        }
                        Ok(Event::Incoming(Packet::PubAck(ack))) => {
                            let _ = events.send(BrokerEvent::PublishAcked(ack.pkid));
                        }
                        Ok(Event::Incoming(Packet::Disconnect)) => {
                            let _ = events.send(BrokerEvent::Disconnected);
                        }
                        Ok(_) => {}
                        Err(err) => {
                            // No reconnect loop here: surface the error and
                            // stop polling.
                            let _ = events.send(BrokerEvent::ConnectionError(err.to_string()));
                            break;
                        }
                    }
                }
            });

            Ok(Box::new(RumqttSession {
                client,
                poller,
                ticket: AtomicU16::new(0),
            }) as Box<dyn BrokerSession>)
        })
    }
}

struct RumqttSession {
    client: AsyncClient,
    poller: JoinHandle<()>,
    ticket: AtomicU16,
}

impl BrokerSession for RumqttSession {
    fn publish<'a>(
        &'a self,
        message: &'a OutboundMessage,
    ) -> BoxFuture<'a, Result<PublishOutcome, BrokerError>> {
        Box::pin(async move {
            let qos = match message.qos {
                QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
                QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            };
            self.client
                .publish(
                    message.topic.clone(),
                    qos,
                    false,
                    message.payload.clone().into_bytes(),
                )
                .await
                .map_err(|err| BrokerError::Publish(err.to_string()))?;

            match message.qos {
                QoS::AtMostOnce => Ok(PublishOutcome::Accepted),
                QoS::AtLeastOnce => {
                    // rumqttc assigns the wire packet id inside its event
                    // loop; hand out a session-local ticket instead.
                    let ticket = self.ticket.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
                    Ok(PublishOutcome::InFlight(ticket))
                }
            }
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Err(err) = self.client.disconnect().await {
                debug!("broker disconnect: {err}");
            }
            self.poller.abort();
        })
    }
}
