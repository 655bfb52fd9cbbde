//! Grid positions and movement actions.
//!
//! The simulator addresses cells with integer `(x, y)` coordinates where `x`
//! grows eastward and `y` grows southward. Agents move one cell per step in
//! any of the eight compass directions, or stay put with [`Action::Skip`].

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::enums::UnknownVariant;

/// An absolute (or, inside a [`CellPercept`](crate::CellPercept), relative)
/// grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Column, growing eastward.
    pub x: i32,
    /// Row, growing southward.
    pub y: i32,
}

impl Position {
    /// Create a position from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Return the position reached by performing `action` once.
    pub const fn step(self, action: Action) -> Self {
        let (dx, dy) = action.offset();
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Translate by a relative offset.
    pub const fn offset_by(self, relative: Self) -> Self {
        Self {
            x: self.x.saturating_add(relative.x),
            y: self.y.saturating_add(relative.y),
        }
    }

    /// Chebyshev distance: the number of 8-directional steps between two
    /// cells on an empty grid.
    pub const fn distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the nine actions an agent may answer a request-action with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Move to `(x, y - 1)`.
    North,
    /// Move to `(x + 1, y - 1)`.
    Northeast,
    /// Move to `(x + 1, y)`.
    East,
    /// Move to `(x + 1, y + 1)`.
    Southeast,
    /// Move to `(x, y + 1)`.
    South,
    /// Move to `(x - 1, y + 1)`.
    Southwest,
    /// Move to `(x - 1, y)`.
    West,
    /// Move to `(x - 1, y - 1)`.
    Northwest,
    /// Stay in place.
    Skip,
}

impl Action {
    /// The eight movement directions in clockwise order starting at north.
    pub const COMPASS: [Self; 8] = [
        Self::North,
        Self::Northeast,
        Self::East,
        Self::Southeast,
        Self::South,
        Self::Southwest,
        Self::West,
        Self::Northwest,
    ];

    /// The four cardinal directions in clockwise order starting at north.
    pub const CARDINAL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Wire name of the action, as the simulator expects it.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::Northeast => "northeast",
            Self::East => "east",
            Self::Southeast => "southeast",
            Self::South => "south",
            Self::Southwest => "southwest",
            Self::West => "west",
            Self::Northwest => "northwest",
            Self::Skip => "skip",
        }
    }

    /// The `(dx, dy)` displacement of this action.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::Northeast => (1, -1),
            Self::East => (1, 0),
            Self::Southeast => (1, 1),
            Self::South => (0, 1),
            Self::Southwest => (-1, 1),
            Self::West => (-1, 0),
            Self::Northwest => (-1, -1),
            Self::Skip => (0, 0),
        }
    }

    /// The next direction clockwise (an eighth of a turn). `Skip` stays `Skip`.
    pub const fn rotate_clockwise(self) -> Self {
        match self {
            Self::North => Self::Northeast,
            Self::Northeast => Self::East,
            Self::East => Self::Southeast,
            Self::Southeast => Self::South,
            Self::South => Self::Southwest,
            Self::Southwest => Self::West,
            Self::West => Self::Northwest,
            Self::Northwest => Self::North,
            Self::Skip => Self::Skip,
        }
    }

    /// The opposite direction. `Skip` stays `Skip`.
    pub const fn inverse(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::Northeast => Self::Southwest,
            Self::East => Self::West,
            Self::Southeast => Self::Northwest,
            Self::South => Self::North,
            Self::Southwest => Self::Northeast,
            Self::West => Self::East,
            Self::Northwest => Self::Southeast,
            Self::Skip => Self::Skip,
        }
    }

    /// The greedy direction from `from` toward `to`; `Skip` when they match.
    pub const fn towards(from: Position, to: Position) -> Self {
        let east = to.x > from.x;
        let west = to.x < from.x;
        let south = to.y > from.y;
        let north = to.y < from.y;
        match (east, west, north, south) {
            (true, _, true, _) => Self::Northeast,
            (true, _, _, true) => Self::Southeast,
            (true, _, _, _) => Self::East,
            (_, true, true, _) => Self::Northwest,
            (_, true, _, true) => Self::Southwest,
            (_, true, _, _) => Self::West,
            (_, _, true, _) => Self::North,
            (_, _, _, true) => Self::South,
            _ => Self::Skip,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Self::COMPASS
            .into_iter()
            .chain(core::iter::once(Self::Skip))
            .find(|action| action.as_str() == lowered)
            .ok_or_else(|| UnknownVariant::new("action", s))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn step_follows_screen_coordinates() {
        let origin = Position::new(5, 5);
        assert_eq!(origin.step(Action::North), Position::new(5, 4));
        assert_eq!(origin.step(Action::Southwest), Position::new(4, 6));
        assert_eq!(origin.step(Action::Skip), origin);
    }

    #[test]
    fn towards_picks_diagonals_and_axes() {
        let from = Position::new(3, 3);
        assert_eq!(Action::towards(from, Position::new(9, 0)), Action::Northeast);
        assert_eq!(Action::towards(from, Position::new(3, 9)), Action::South);
        assert_eq!(Action::towards(from, Position::new(0, 3)), Action::West);
        assert_eq!(Action::towards(from, from), Action::Skip);
    }

    #[test]
    fn clockwise_rotation_cycles_through_all_eight() {
        let mut action = Action::East;
        for expected in [
            Action::Southeast,
            Action::South,
            Action::Southwest,
            Action::West,
            Action::Northwest,
            Action::North,
            Action::Northeast,
            Action::East,
        ] {
            action = action.rotate_clockwise();
            assert_eq!(action, expected);
        }
    }

    #[test]
    fn chebyshev_distance() {
        assert_eq!(Position::new(0, 0).distance(Position::new(3, -7)), 7);
        assert_eq!(Position::new(2, 2).distance(Position::new(2, 2)), 0);
    }

    #[test]
    fn action_parses_case_insensitively() {
        assert_eq!("NorthEast".parse::<Action>().unwrap(), Action::Northeast);
        assert!("jump".parse::<Action>().is_err());
    }

    #[test]
    fn inverse_is_involutive() {
        for action in Action::COMPASS {
            assert_eq!(action.inverse().inverse(), action);
            assert_ne!(action.inverse(), action);
        }
    }
}
