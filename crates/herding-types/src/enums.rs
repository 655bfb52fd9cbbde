//! Enumeration types shared across the cohort.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Returned when a wire string does not name any variant of an enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The offending input.
    pub value: String,
}

impl UnknownVariant {
    /// Build an error for `value` not naming a `kind`.
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Lifecycle state of an agent.
///
/// Every agent holds exactly one current value. Peers keep a last-known copy
/// of each other's state, learned from `myState` notifications, which may be
/// stale. `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    /// Election in progress (or restarted after a reset).
    #[default]
    Init,
    /// Election decided, follower awaiting its first command.
    Ready,
    /// Walking the checkpoint tour.
    Idle,
    /// Heading to a commanded destination.
    Walking,
    /// Exploring the border for a fence switch.
    Scouting,
    /// Holding position until told otherwise.
    Waiting,
    /// All checkpoints visited.
    Finished,
    /// Cohort done; no further transitions.
    Terminated,
}

impl AgentState {
    /// All states in lifecycle order.
    pub const ALL: [Self; 8] = [
        Self::Init,
        Self::Ready,
        Self::Idle,
        Self::Walking,
        Self::Scouting,
        Self::Waiting,
        Self::Finished,
        Self::Terminated,
    ];

    /// Wire name of the state, as carried by `myState`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Ready => "ready",
            Self::Idle => "idle",
            Self::Walking => "walking",
            Self::Scouting => "scouting",
            Self::Waiting => "waiting",
            Self::Finished => "finished",
            Self::Terminated => "terminated",
        }
    }

    /// Whether this state is absorbing.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentState {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("agent state", s))
    }
}

/// One thing the simulator reports inside a perceived cell.
///
/// A cell may hold several contents at once (an agent standing in the
/// corral, for example).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum CellContent {
    /// An impassable obstacle.
    Obstacle,
    /// Another agent (or this one).
    Agent,
    /// A cow, identified by the simulator.
    Cow {
        /// Simulator-assigned cow identifier.
        id: i64,
    },
    /// Part of a corral.
    Corral,
    /// A fence switch.
    Switch,
    /// A fence segment.
    Fence {
        /// Whether the fence is currently open.
        open: bool,
    },
    /// Nothing at all.
    Empty,
}
