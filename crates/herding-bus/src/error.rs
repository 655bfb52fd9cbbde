//! Error types for the message bus.

/// Errors that can occur while handing a message to the bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The addressed peer is not part of the cohort.
    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    /// The envelope could not be serialized.
    #[error("serde error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Failed to connect to or communicate with the NATS server.
    #[error("NATS error: {0}")]
    Nats(String),
}
