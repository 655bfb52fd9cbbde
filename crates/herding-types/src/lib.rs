//! Shared type definitions for the herding cohort agents.
//!
//! Every crate in the workspace speaks in terms of these types: the session
//! decodes simulator envelopes into [`Perception`], the world map stores
//! grid knowledge keyed by [`Position`], and the coordination engine trades
//! [`CoordinationMessage`]s over the bus.
//!
//! # Modules
//!
//! - [`geometry`] -- Grid positions and the nine movement actions
//! - [`enums`] -- Agent lifecycle states and observed cell contents
//! - [`perception`] -- Per-cycle perception and simulation start/end payloads
//! - [`messages`] -- Coordination messages exchanged between peers

pub mod enums;
pub mod geometry;
pub mod messages;
pub mod perception;

pub use enums::{AgentState, CellContent, UnknownVariant};
pub use geometry::{Action, Position};
pub use messages::{CoordinationMessage, Envelope, FeatureRecord};
pub use perception::{CellPercept, Perception, SimEnd, SimStart};
