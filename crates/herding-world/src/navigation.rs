//! Movement helpers built on the [`WorldMap`].
//!
//! Deliberately simple: greedy one-step planning with deflection around
//! known obstacles, and a border-following heading for the scout. Both are
//! deterministic for identical map contents and endpoints.

use herding_types::{Action, Position};

use crate::world_map::WorldMap;

impl WorldMap {
    /// Pick the single step that brings `from` closer to `to`.
    ///
    /// Starts with the greedy direction (reduces Chebyshev distance). If the
    /// cell it leads to is blocked, the remaining seven directions are tried
    /// clockwise; unknown cells count as passable. Returns [`Action::Skip`]
    /// when already at `to` or when every neighbour is blocked.
    pub fn plan_single_step(&self, from: Position, to: Position) -> Action {
        let greedy = Action::towards(from, to);
        if greedy == Action::Skip {
            return Action::Skip;
        }
        let mut candidate = greedy;
        for _ in 0..Action::COMPASS.len() {
            if !self.is_blocked(from.step(candidate)) {
                return candidate;
            }
            candidate = candidate.rotate_clockwise();
        }
        Action::Skip
    }

    /// Heading for a scout sweeping the map border clockwise.
    ///
    /// Away from the border the heading points at the nearest edge; on the
    /// border ring (one cell in from the edge) it runs north along the west
    /// edge, east along the top, south along the east edge and west along
    /// the bottom.
    pub fn scout_heading(&self, pos: Position) -> Action {
        let x = i64::from(pos.x);
        let y = i64::from(pos.y);
        let width = i64::from(self.width());
        let height = i64::from(self.height());

        let left = 1_i64;
        let top = 1_i64;
        let right = width.saturating_sub(2);
        let bottom = height.saturating_sub(2);
        let center = width / 2;
        let middle = height / 2;

        if x > left && x < right && y > top && y < bottom {
            if x.abs_diff(center) < y.abs_diff(middle) {
                if y < middle { Action::North } else { Action::South }
            } else if x < center {
                Action::West
            } else {
                Action::East
            }
        } else if x <= left && y > top {
            Action::North
        } else if y <= top && x < right {
            Action::East
        } else if x >= right && y < bottom {
            Action::South
        } else if y >= bottom && x > left {
            Action::West
        } else {
            Action::Skip
        }
    }
}

/// Whether `pos` is within `radius` steps (Chebyshev) of `checkpoint`.
pub const fn is_near_checkpoint(pos: Position, checkpoint: Position, radius: u32) -> bool {
    pos.distance(checkpoint) <= radius
}
