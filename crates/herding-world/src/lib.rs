//! Grid knowledge for the herding cohort agents.
//!
//! Each agent keeps a private, partially observed copy of the grid. It starts
//! fully unknown and is filled in from the agent's own perception windows,
//! one refresh per cycle. Peer observations are never merged in.
//!
//! # Modules
//!
//! - [`error`] -- Error types for map construction.
//! - [`world_map`] -- The [`WorldMap`] grid, refresh, and feature queries.
//! - [`navigation`] -- Single-step planning, border scouting, checkpoints.

pub mod error;
pub mod navigation;
pub mod world_map;

pub use error::WorldError;
pub use navigation::is_near_checkpoint;
pub use world_map::{Cell, WorldMap};
