//! Message bus over a NATS server.
//!
//! Every agent subscribes to `{prefix}.{name}`. A direct send publishes on
//! the peer's subject; a broadcast publishes once per roster member other
//! than the sender. Envelopes travel as JSON.
//!
//! Publishing goes through a single background task fed by an unbounded
//! channel so that one agent's messages leave in the order they were sent.
//! A second background task forwards everything received on the agent's
//! subject into its [`Inbox`].

use futures::StreamExt as _;
use herding_types::{CoordinationMessage, Envelope};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::MessageBus;
use crate::error::BusError;
use crate::inbox::Inbox;

/// A serialized envelope waiting to be published.
struct Outgoing {
    subject: String,
    payload: Vec<u8>,
}

/// NATS-backed bus handle for one agent.
pub struct NatsBus {
    name: String,
    prefix: String,
    roster: Vec<String>,
    inbox: Inbox,
    outgoing: mpsc::UnboundedSender<Outgoing>,
    publisher: JoinHandle<()>,
    listener: JoinHandle<()>,
}

impl NatsBus {
    /// Connect to `url`, subscribe to this agent's subject and start the
    /// publisher and listener tasks.
    ///
    /// `roster` lists every cohort member; the agent's own name may be
    /// included and is skipped when broadcasting.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Nats`] if the connection or subscription fails.
    pub async fn connect(
        url: &str,
        prefix: &str,
        name: &str,
        roster: Vec<String>,
    ) -> Result<Self, BusError> {
        info!(url = url, agent = name, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Nats(format!("failed to connect to {url}: {e}")))?;

        let subject = subject_for(prefix, name);
        let mut subscriber = client
            .subscribe(subject.clone())
            .await
            .map_err(|e| BusError::Nats(format!("failed to subscribe to {subject}: {e}")))?;
        info!(subject = subject, "subscribed to agent subject");

        let inbox = Inbox::new();
        let delivery = inbox.clone();
        let listener = tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                match decode_envelope(&message.payload) {
                    Ok(envelope) => delivery.push(envelope),
                    Err(e) => {
                        warn!(
                            subject = %message.subject,
                            error = %e,
                            "dropping undecodable bus message"
                        );
                    }
                }
            }
            debug!("bus subscription ended");
        });

        let (outgoing, mut queue) = mpsc::unbounded_channel::<Outgoing>();
        let publisher = tokio::spawn(async move {
            while let Some(Outgoing { subject, payload }) = queue.recv().await {
                if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                    warn!(subject = subject, error = %e, "failed to publish bus message");
                }
            }
        });

        Ok(Self {
            name: name.to_owned(),
            prefix: prefix.to_owned(),
            roster,
            inbox,
            outgoing,
            publisher,
            listener,
        })
    }

    fn enqueue(&self, peer: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.outgoing
            .send(Outgoing {
                subject: subject_for(&self.prefix, peer),
                payload,
            })
            .map_err(|e| BusError::Nats(format!("publisher task stopped: {e}")))
    }
}

impl MessageBus for NatsBus {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, peer: &str, message: CoordinationMessage) -> Result<(), BusError> {
        if !self.roster.iter().any(|member| member == peer) {
            return Err(BusError::UnknownPeer(peer.to_owned()));
        }
        let payload = encode_envelope(&Envelope::new(self.name.clone(), message))?;
        self.enqueue(peer, payload)
    }

    fn broadcast(&self, message: CoordinationMessage) -> Result<(), BusError> {
        let payload = encode_envelope(&Envelope::new(self.name.clone(), message))?;
        for peer in self.roster.iter().filter(|member| **member != self.name) {
            self.enqueue(peer, payload.clone())?;
        }
        Ok(())
    }

    fn take_all(&self) -> Vec<Envelope> {
        self.inbox.take_all()
    }
}

impl Drop for NatsBus {
    fn drop(&mut self) {
        self.listener.abort();
        self.publisher.abort();
    }
}

impl std::fmt::Debug for NatsBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsBus")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("roster", &self.roster)
            .finish_non_exhaustive()
    }
}

/// Subject an agent listens on.
pub fn subject_for(prefix: &str, agent: &str) -> String {
    format!("{prefix}.{agent}")
}

/// Serialize an envelope for the wire.
///
/// # Errors
///
/// Returns [`BusError::Serialize`] if serialization fails.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, BusError> {
    Ok(serde_json::to_vec(envelope)?)
}

/// Deserialize an envelope received from the wire.
///
/// # Errors
///
/// Returns [`BusError::Serialize`] if the payload is not a valid envelope.
pub fn decode_envelope(data: &[u8]) -> Result<Envelope, BusError> {
    Ok(serde_json::from_slice(data)?)
}
