//! Error types for the agent binary.
//!
//! Wraps the per-layer errors so one agent's failure can be reported once
//! and the remaining agents keep running.

use herding_bus::BusError;
use herding_session::SessionError;

use crate::config::ConfigError;

/// Errors that end an agent (or, for configuration, the whole process).
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Configuration could not be loaded or is inconsistent.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The simulator session failed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// The peer bus could not be set up.
    #[error("bus error: {0}")]
    Bus(#[from] BusError),
}
