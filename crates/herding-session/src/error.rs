//! Error types for the simulator session.
//!
//! Connection and authentication failures end the session. Malformed data
//! only costs the offending cycle: the loop logs it and waits for the next
//! envelope.

use crate::session::SessionState;

/// Errors that can occur while driving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The channel could not be opened, or failed mid-session. Fatal.
    #[error("connection error: {0}")]
    Connection(String),

    /// The simulator did not accept the credentials, or answered with
    /// something other than an authentication response. Fatal.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// An envelope could not be decoded. Recoverable.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The operation is not valid in the session's current state.
    #[error("session is {0:?}, operation not allowed")]
    InvalidState(SessionState),
}

impl SessionError {
    /// Whether the session can keep going after this error.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}
