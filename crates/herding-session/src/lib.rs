//! Session with the herding simulator.
//!
//! One [`Session`] owns one duplex connection. It authenticates once, then
//! repeatedly waits for the next simulator envelope and dispatches it to a
//! [`SessionHandler`]. Every request-action envelope is answered with
//! exactly one action reply; simulation start and end envelopes are never
//! answered.
//!
//! # Architecture
//!
//! ```text
//! TCP --> frame (NUL-terminated) --> XML element --> Inbound --> handler
//!                                                                   |
//! TCP <-- frame <-- XML element <-- action reply <------------------+
//! ```
//!
//! # Modules
//!
//! - [`codec`] -- Minimal XML element tree and NUL-byte framing.
//! - [`error`] -- Session error taxonomy.
//! - [`protocol`] -- Envelope classification and payload decoding.
//! - [`session`] -- The session state machine and perceive-act loop.
//! - [`sink`] -- Best-effort observability sink for raw traffic.

pub mod codec;
pub mod error;
pub mod protocol;
pub mod session;
pub mod sink;

pub use codec::Element;
pub use error::SessionError;
pub use protocol::{Inbound, MessageKind};
pub use session::{CloseReason, Session, SessionHandler, SessionState};
pub use sink::{ChannelSink, Direction, TracingSink, TrafficRecord, TrafficSink};
