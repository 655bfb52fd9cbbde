//! Coordination messages exchanged between cohort members over the bus.
//!
//! Each message is a string type tag plus at most one typed payload. On the
//! wire (JSON over the bus) this is an adjacently tagged object:
//!
//! ```text
//! {"type":"myNumber","payload":42}
//! {"type":"scout"}
//! ```

use serde::{Deserialize, Serialize};

use crate::enums::AgentState;
use crate::geometry::{Action, Position};

/// A fence discovered by the scout.
///
/// `direction` is the compass direction in which the fence extends from
/// its switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRecord {
    /// Where the switch sits.
    pub switch_position: Position,
    /// Direction of the fence relative to the switch.
    pub direction: Action,
    /// Whether the fence was open when observed.
    pub opened: bool,
}

impl FeatureRecord {
    /// The cell right next to the switch, along the fence.
    ///
    /// This is where the scout stands to hold the fence open.
    pub const fn position_after_switch(&self) -> Position {
        self.switch_position.step(self.direction)
    }

    /// A waypoint on the far side of the fence.
    ///
    /// Two cells beside the switch (perpendicular to the fence) and then two
    /// cells along the fence direction. Non-cardinal directions fall back to
    /// offsetting from the switch itself.
    pub const fn position_behind_fence(&self) -> Position {
        let Position { x, y } = self.switch_position;
        let beside = match self.direction {
            Action::North => Position::new(x.saturating_add(2), y),
            Action::East => Position::new(x, y.saturating_add(2)),
            Action::South => Position::new(x.saturating_sub(2), y),
            Action::West => Position::new(x, y.saturating_sub(2)),
            _ => self.switch_position,
        };
        beside.step(self.direction).step(self.direction)
    }
}

/// A coordination message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum CoordinationMessage {
    /// Abandon the current election and all role state; start over.
    Reset,
    /// The sender's tie-break number for this election epoch.
    MyNumber(i64),
    /// The sender's own election verdict.
    Leader(bool),
    /// The sender changed state.
    MyState(AgentState),
    /// The sender reached a destination.
    MyPosition(Position),
    /// Leader command: walk to the given position.
    Goto(Position),
    /// Leader command: start scouting.
    Scout,
    /// Leader command: resume the checkpoint tour.
    IdleWalk,
    /// Leader command: the cohort is done.
    Terminate,
    /// Scout report: a fence was located.
    FoundFence(FeatureRecord),
}

impl CoordinationMessage {
    /// The string type tag of this message.
    pub const fn type_tag(&self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::MyNumber(_) => "myNumber",
            Self::Leader(_) => "leader",
            Self::MyState(_) => "myState",
            Self::MyPosition(_) => "myPosition",
            Self::Goto(_) => "goto",
            Self::Scout => "scout",
            Self::IdleWalk => "idleWalk",
            Self::Terminate => "terminate",
            Self::FoundFence(_) => "foundFence",
        }
    }

    /// Whether this is a command only the leader may issue.
    pub const fn is_leader_command(&self) -> bool {
        matches!(
            self,
            Self::Goto(_) | Self::Scout | Self::IdleWalk | Self::Terminate
        )
    }
}

/// A message together with the name of the peer that sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sending agent's name.
    pub sender: String,
    /// The message itself.
    pub message: CoordinationMessage,
}

impl Envelope {
    /// Wrap `message` as sent by `sender`.
    pub fn new(sender: impl Into<String>, message: CoordinationMessage) -> Self {
        Self {
            sender: sender.into(),
            message,
        }
    }
}
