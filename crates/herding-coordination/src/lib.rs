//! Decentralized coordination for a cohort of herding agents.
//!
//! Agents share no memory: everything here is driven by the agent's own
//! perception and the messages drained from its bus inbox. The cohort
//! elects a leader by randomized tie-break numbers, heals number collisions
//! with a `reset` broadcast, and then follows the leader's state-conditioned
//! commands.
//!
//! The engine does no I/O. It returns the action and outgoing messages for
//! each cycle; the caller replies to the simulator and publishes to the bus.
//!
//! # Modules
//!
//! - [`config`] -- Engine tunables ([`CoordinationConfig`]).
//! - [`election`] -- Tie-break sources and the election tally.
//! - [`engine`] -- The per-agent [`Engine`] state machine.
//! - [`peers`] -- Last-known peer metadata in discovery order.

pub mod config;
pub mod election;
pub mod engine;
pub mod peers;

pub use config::CoordinationConfig;
pub use election::{RandomTieBreaker, ScriptedTieBreaker, Tally, TieBreaker};
pub use engine::{Decision, Engine, Outgoing, PendingIntent, Recipient};
pub use peers::{PeerInfo, PeerTable};
