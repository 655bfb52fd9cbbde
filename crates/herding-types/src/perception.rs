//! Payloads the simulator delivers to an agent.
//!
//! A [`Perception`] arrives with every request-action cycle; [`SimStart`]
//! and [`SimEnd`] bracket a match.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::CellContent;
use crate::geometry::Position;

/// A single perceived cell, addressed relative to the perceiving agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPercept {
    /// Offset from the agent's own position.
    pub offset: Position,
    /// Everything observed in the cell.
    pub contents: Vec<CellContent>,
}

impl CellPercept {
    /// Create a percept at `(dx, dy)` holding `contents`.
    pub fn new(dx: i32, dy: i32, contents: Vec<CellContent>) -> Self {
        Self {
            offset: Position::new(dx, dy),
            contents,
        }
    }

    /// Whether the cell reports the given content.
    pub fn contains(&self, content: CellContent) -> bool {
        self.contents.contains(&content)
    }

    /// Whether the cell holds an obstacle or a cow.
    pub fn has_obstacle_or_cow(&self) -> bool {
        self.contents
            .iter()
            .any(|c| matches!(c, CellContent::Obstacle | CellContent::Cow { .. }))
    }

    /// The fence state in the cell, if any: `Some(true)` for open.
    pub fn fence(&self) -> Option<bool> {
        self.contents.iter().find_map(|c| match c {
            CellContent::Fence { open } => Some(*open),
            _ => None,
        })
    }
}

/// Snapshot delivered with each request-action message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perception {
    /// Perception identifier, echoed back in the action reply.
    pub id: String,
    /// The agent's absolute position.
    pub position: Position,
    /// Simulation step counter.
    pub step: u64,
    /// Number of cows already in the team's corral.
    pub cows_in_corral: u32,
    /// Cells in the visibility window, relative to `position`.
    pub cells: Vec<CellPercept>,
}

/// Match parameters delivered with the simulation-start message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimStart {
    /// Grid width in cells.
    pub grid_width: u32,
    /// Grid height in cells.
    pub grid_height: u32,
    /// Visibility radius of each agent.
    pub line_of_sight: u32,
}

/// Match outcome delivered with the simulation-end message.
///
/// The simulator's result attributes are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimEnd {
    /// Raw result attributes (score, ranking, ...).
    pub attributes: BTreeMap<String, String>,
}
