//! Tunables for the coordination engine.

use herding_types::Position;
use serde::{Deserialize, Serialize};

/// Default cohort size excluding self.
pub const DEFAULT_EXPECTED_PEERS: usize = 2;

/// Default Chebyshev radius within which a checkpoint counts as visited.
pub const DEFAULT_CHECKPOINT_RADIUS: u32 = 4;

/// Default number of cycles between `myNumber` re-announcements.
pub const DEFAULT_ANNOUNCE_INTERVAL: u32 = 5;

/// Default checkpoint tour, one near each corner of a 30x30 grid.
pub const DEFAULT_CHECKPOINTS: [Position; 4] = [
    Position::new(2, 2),
    Position::new(27, 2),
    Position::new(27, 27),
    Position::new(2, 27),
];

/// Coordination engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Number of peers (cohort size minus self) whose numbers must be known
    /// before the election is decided.
    pub expected_peers: usize,
    /// Checkpoints visited in order by idle walkers and the scout.
    pub checkpoints: Vec<Position>,
    /// A checkpoint counts as visited once an agent is within this
    /// Chebyshev distance of it.
    pub checkpoint_radius: u32,
    /// Cycles spent waiting for missing numbers before re-broadcasting our
    /// own. Zero disables re-announcement.
    pub announce_interval: u32,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            expected_peers: DEFAULT_EXPECTED_PEERS,
            checkpoints: DEFAULT_CHECKPOINTS.to_vec(),
            checkpoint_radius: DEFAULT_CHECKPOINT_RADIUS,
            announce_interval: DEFAULT_ANNOUNCE_INTERVAL,
        }
    }
}

impl CoordinationConfig {
    /// Configuration for a cohort of `cohort_size` agents, self included.
    pub fn for_cohort(cohort_size: usize) -> Self {
        Self {
            expected_peers: cohort_size.saturating_sub(1),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_four_corner_tour() {
        let config = CoordinationConfig::default();
        assert_eq!(config.expected_peers, 2);
        assert_eq!(config.checkpoints.len(), 4);
        assert_eq!(config.checkpoints.first(), Some(&Position::new(2, 2)));
        assert_eq!(config.checkpoint_radius, 4);
    }

    #[test]
    fn cohort_size_excludes_self() {
        assert_eq!(CoordinationConfig::for_cohort(3).expected_peers, 2);
        assert_eq!(CoordinationConfig::for_cohort(0).expected_peers, 0);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: CoordinationConfig =
            serde_json::from_str(r#"{"expected_peers": 5, "announce_interval": 0}"#).unwrap();
        assert_eq!(config.expected_peers, 5);
        assert_eq!(config.announce_interval, 0);
        assert_eq!(config.checkpoint_radius, DEFAULT_CHECKPOINT_RADIUS);
    }
}
