//! Best-effort observability sink for raw traffic.
//!
//! Every frame the session sends or receives is handed to a
//! [`TrafficSink`]. Sinks must never block or fail the session: a sink that
//! cannot keep up drops records.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{trace, warn};

/// Tracing target used by [`TracingSink`].
pub const TRAFFIC_TARGET: &str = "herding::traffic";

/// Which way a frame travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Simulator to agent.
    Inbound,
    /// Agent to simulator.
    Outbound,
}

impl Direction {
    /// Short label for log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "in",
            Self::Outbound => "out",
        }
    }
}

/// One observed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficRecord {
    /// When the frame was observed.
    pub at: DateTime<Utc>,
    /// Agent whose session carried the frame.
    pub agent: String,
    /// Which way it travelled.
    pub direction: Direction,
    /// Frame payload without the terminator, decoded lossily.
    pub payload: String,
}

impl TrafficRecord {
    /// Build a record stamped with the current time.
    pub fn now(agent: &str, direction: Direction, payload: &[u8]) -> Self {
        Self {
            at: Utc::now(),
            agent: agent.to_owned(),
            direction,
            payload: String::from_utf8_lossy(payload).into_owned(),
        }
    }
}

/// Receives a copy of every frame a session exchanges.
pub trait TrafficSink: Send + Sync {
    /// Record one frame. Must not block.
    fn record(&self, record: TrafficRecord);
}

/// Writes every frame as a `trace`-level event under [`TRAFFIC_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TrafficSink for TracingSink {
    fn record(&self, record: TrafficRecord) {
        trace!(
            target: TRAFFIC_TARGET,
            agent = %record.agent,
            direction = record.direction.as_str(),
            at = %record.at.to_rfc3339(),
            payload = %record.payload,
            "frame"
        );
    }
}

/// Forwards records into a bounded channel, dropping them when it is full.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<TrafficRecord>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TrafficRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl TrafficSink for ChannelSink {
    fn record(&self, record: TrafficRecord) {
        match self.tx.try_send(record) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(
                    agent = %dropped.agent,
                    direction = dropped.direction.as_str(),
                    "traffic sink full, record dropped"
                );
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_forwards_records() {
        let (sink, mut rx) = ChannelSink::new(4);
        sink.record(TrafficRecord::now("b1", Direction::Inbound, b"<message/>"));
        let record = rx.try_recv().unwrap();
        assert_eq!(record.agent, "b1");
        assert_eq!(record.direction, Direction::Inbound);
        assert_eq!(record.payload, "<message/>");
    }

    #[test]
    fn full_channel_drops_without_blocking() {
        let (sink, mut rx) = ChannelSink::new(1);
        sink.record(TrafficRecord::now("b1", Direction::Outbound, b"first"));
        sink.record(TrafficRecord::now("b1", Direction::Outbound, b"second"));
        assert_eq!(rx.try_recv().unwrap().payload, "first");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (sink, rx) = ChannelSink::new(1);
        drop(rx);
        sink.record(TrafficRecord::now("b1", Direction::Inbound, b"late"));
    }

    #[test]
    fn lossy_payload_decoding() {
        let record = TrafficRecord::now("b2", Direction::Inbound, &[0x3c, 0xff, 0x3e]);
        assert_eq!(record.payload, "<\u{fffd}>");
    }
}
