//! The partially observed grid.
//!
//! A [`WorldMap`] is a dense `width x height` array of [`Cell`] tags indexed
//! by absolute position. Cells begin as [`Cell::Unknown`] and only ever move
//! toward an observed tag; a refresh never invents content that no percept
//! reported.

use std::collections::BTreeSet;
use std::fmt;

use herding_types::{Action, CellContent, CellPercept, FeatureRecord, Position};
use tracing::debug;

use crate::error::WorldError;

/// What the agent believes occupies a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cell {
    /// Never observed.
    #[default]
    Unknown,
    /// Observed empty (or corral) ground.
    Free,
    /// Obstacle or cow.
    Wall,
    /// A closed fence segment.
    FeatureClosed,
    /// An open fence segment.
    FeatureOpen,
    /// A fence switch.
    FeatureSwitch,
    /// Another agent.
    Agent,
}

impl Cell {
    /// Whether an agent cannot step into a cell with this tag.
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::Wall | Self::FeatureClosed | Self::Agent)
    }

    /// Single-character rendering used by [`WorldMap`]'s `Display`.
    pub const fn symbol(self) -> char {
        match self {
            Self::Unknown => '*',
            Self::Free => ' ',
            Self::Wall => '#',
            Self::FeatureClosed => '+',
            Self::FeatureOpen => '.',
            Self::FeatureSwitch => '%',
            Self::Agent => '@',
        }
    }

    /// The tag a percept resolves to, or `None` when it reports nothing
    /// recognisable.
    ///
    /// Precedence: empty/corral, obstacle/cow, closed fence, open fence,
    /// switch, agent.
    pub fn from_percept(percept: &CellPercept) -> Option<Self> {
        if percept.contains(CellContent::Empty) || percept.contains(CellContent::Corral) {
            Some(Self::Free)
        } else if percept.has_obstacle_or_cow() {
            Some(Self::Wall)
        } else if let Some(open) = percept.fence() {
            Some(if open { Self::FeatureOpen } else { Self::FeatureClosed })
        } else if percept.contains(CellContent::Switch) {
            Some(Self::FeatureSwitch)
        } else if percept.contains(CellContent::Agent) {
            Some(Self::Agent)
        } else {
            None
        }
    }
}

/// The agent's merged view of the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldMap {
    width: u32,
    height: u32,
    /// Row-major cells: index `y * width + x`.
    cells: Vec<Cell>,
}

impl WorldMap {
    /// Create an all-unknown map.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] when either dimension is
    /// zero or the grid cannot be addressed with `i32` coordinates.
    pub fn new(width: u32, height: u32) -> Result<Self, WorldError> {
        let invalid = WorldError::InvalidDimensions { width, height };
        if width == 0 || height == 0 || i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(invalid);
        }
        let len = usize::try_from(width)
            .ok()
            .zip(usize::try_from(height).ok())
            .and_then(|(w, h)| w.checked_mul(h))
            .ok_or(invalid)?;
        Ok(Self {
            width,
            height,
            cells: vec![Cell::Unknown; len],
        })
    }

    /// Grid width in cells.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Forget everything; every cell becomes unknown again.
    pub fn reset(&mut self) {
        self.cells.fill(Cell::Unknown);
    }

    /// Whether `pos` lies on the grid.
    pub fn contains(&self, pos: Position) -> bool {
        self.index(pos).is_some()
    }

    /// The tag at `pos`, or `None` outside the grid.
    pub fn get(&self, pos: Position) -> Option<Cell> {
        self.index(pos).and_then(|i| self.cells.get(i)).copied()
    }

    /// Whether stepping into `pos` is impossible. Off-grid counts as blocked;
    /// unknown cells do not.
    pub fn is_blocked(&self, pos: Position) -> bool {
        self.get(pos).is_none_or(Cell::is_blocked)
    }

    /// Merge one perception window into the map.
    ///
    /// Each percept's offset is translated by `self_position`; the resulting
    /// cell is overwritten with the percept's tag (last write wins within a
    /// call). Percepts with no recognisable content, or landing off the
    /// grid, are skipped. Returns the number of cells written.
    ///
    /// Applying the same window twice yields the same map as applying it once.
    pub fn refresh(&mut self, self_position: Position, percepts: &[CellPercept]) -> usize {
        let mut written: usize = 0;
        for percept in percepts {
            let absolute = self_position.offset_by(percept.offset);
            let Some(tag) = Cell::from_percept(percept) else {
                continue;
            };
            match self.index(absolute).and_then(|i| self.cells.get_mut(i)) {
                Some(slot) => {
                    *slot = tag;
                    written = written.saturating_add(1);
                }
                None => {
                    debug!(position = %absolute, "percept outside grid, ignoring");
                }
            }
        }
        written
    }

    /// All positions currently tagged as a fence switch.
    pub fn find_feature_switches(&self) -> BTreeSet<Position> {
        self.positions()
            .filter(|&pos| self.get(pos) == Some(Cell::FeatureSwitch))
            .collect()
    }

    /// Describe the fence attached to the switch at `switch`, if one is known.
    ///
    /// The cardinal neighbours are checked in north, east, south, west
    /// order; the first fence segment found gives the fence direction and
    /// whether it is open.
    pub fn fence_at_switch(&self, switch: Position) -> Option<FeatureRecord> {
        Action::CARDINAL.into_iter().find_map(|direction| {
            let opened = match self.get(switch.step(direction))? {
                Cell::FeatureOpen => true,
                Cell::FeatureClosed => false,
                _ => return None,
            };
            Some(FeatureRecord {
                switch_position: switch,
                direction,
                opened,
            })
        })
    }

    /// Number of cells that have been observed at least once.
    pub fn known_cells(&self) -> usize {
        self.cells.iter().filter(|c| **c != Cell::Unknown).count()
    }

    /// Iterate over every on-grid position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let width = i32::try_from(self.width).unwrap_or(0);
        let height = i32::try_from(self.height).unwrap_or(0);
        (0..height).flat_map(move |y| (0..width).map(move |x| Position::new(x, y)))
    }

    fn index(&self, pos: Position) -> Option<usize> {
        let x = u32::try_from(pos.x).ok()?;
        let y = u32::try_from(pos.y).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        let row = usize::try_from(y).ok()?.checked_mul(usize::try_from(self.width).ok()?)?;
        row.checked_add(usize::try_from(x).ok()?)
    }
}

impl fmt::Display for WorldMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = usize::try_from(self.width).unwrap_or(usize::MAX);
        for row in self.cells.chunks(width) {
            let line: String = row.iter().map(|c| c.symbol()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
