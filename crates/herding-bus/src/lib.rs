//! Peer message bus for the herding cohort agents.
//!
//! The bus is unordered across senders and best-effort: messages may be
//! lost, duplicated, or interleave arbitrarily with perception cycles. The
//! only guarantee is that messages from one sender are observed in the
//! order they were sent.
//!
//! Delivery appends to the receiving agent's [`Inbox`] at any time; the
//! coordination engine drains the whole inbox once at the start of each
//! cycle with [`MessageBus::take_all`].
//!
//! # Modules
//!
//! - [`error`] -- Error types for bus operations.
//! - [`inbox`] -- Thread-safe FIFO of received envelopes.
//! - [`local`] -- In-process bus shared by agents in one process.
//! - [`nats`] -- Bus over a NATS server, one subject per agent.

pub mod error;
pub mod inbox;
pub mod local;
pub mod nats;

use herding_types::{CoordinationMessage, Envelope};

pub use error::BusError;
pub use inbox::Inbox;
pub use local::{LocalBus, LocalHub};
pub use nats::NatsBus;

/// The message bus as seen by one agent.
pub trait MessageBus: Send + Sync {
    /// Name of the agent this handle belongs to.
    fn name(&self) -> &str;

    /// Send `message` to a single peer.
    ///
    /// # Errors
    ///
    /// Returns [`BusError`] when the peer is unknown or the message cannot
    /// be handed to the transport. Success does not imply delivery.
    fn send(&self, peer: &str, message: CoordinationMessage) -> Result<(), BusError>;

    /// Send `message` to every other member of the cohort.
    ///
    /// # Errors
    ///
    /// Returns [`BusError`] when the message cannot be handed to the
    /// transport.
    fn broadcast(&self, message: CoordinationMessage) -> Result<(), BusError>;

    /// Drain everything received since the previous call, oldest first.
    fn take_all(&self) -> Vec<Envelope>;
}
