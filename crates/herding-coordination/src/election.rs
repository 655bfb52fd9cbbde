//! Randomized leader election.
//!
//! Every agent draws a 64-bit number and broadcasts it. Once the numbers of
//! all expected peers are known, the agent holding the maximum is leader.
//! An agent that finds its own number duplicated broadcasts `reset`, which
//! sends the whole cohort back to a fresh draw.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::peers::PeerTable;

/// Source of election tie-break numbers.
pub trait TieBreaker: Send {
    /// Draw the number for a new election epoch.
    fn draw(&mut self) -> i64;
}

/// Uniformly random numbers from a seeded [`StdRng`].
#[derive(Debug, Clone)]
pub struct RandomTieBreaker {
    rng: StdRng,
}

impl RandomTieBreaker {
    /// Seed from the operating system.
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic sequence for a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl TieBreaker for RandomTieBreaker {
    fn draw(&mut self) -> i64 {
        self.rng.random()
    }
}

/// Replays a fixed list of numbers, then falls back to a seeded generator.
///
/// Used to stage collisions and orderings in tests and replays.
#[derive(Debug, Clone)]
pub struct ScriptedTieBreaker {
    script: VecDeque<i64>,
    fallback: RandomTieBreaker,
}

impl ScriptedTieBreaker {
    /// Replay `numbers` in order.
    pub fn new(numbers: impl IntoIterator<Item = i64>) -> Self {
        Self {
            script: numbers.into_iter().collect(),
            fallback: RandomTieBreaker::seeded(0),
        }
    }
}

impl TieBreaker for ScriptedTieBreaker {
    fn draw(&mut self) -> i64 {
        self.script
            .pop_front()
            .unwrap_or_else(|| self.fallback.draw())
    }
}

/// Result of comparing our number against the known peer numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tally {
    /// Not every expected peer has announced a number yet.
    Pending {
        /// Peers whose number is known.
        known: usize,
    },
    /// A peer holds the same number as us.
    Collision {
        /// The peer we collide with.
        with: String,
    },
    /// All numbers known and distinct from ours.
    Decided {
        /// Whether we hold the maximum.
        leader: bool,
    },
}

/// Compare `mine` against every peer number in `peers`.
///
/// Only collisions with our own number are detected. Two peers sharing a
/// number will notice it themselves.
pub fn tally(mine: i64, peers: &PeerTable, expected_peers: usize) -> Tally {
    let known = peers.numbers().count();
    if known < expected_peers {
        return Tally::Pending { known };
    }
    if let Some((name, _)) = peers.numbers().find(|&(_, n)| n == mine) {
        return Tally::Collision {
            with: name.to_owned(),
        };
    }
    Tally::Decided {
        leader: peers.numbers().all(|(_, n)| n < mine),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn table(numbers: &[(&str, Option<i64>)]) -> PeerTable {
        let mut table = PeerTable::new();
        for &(name, number) in numbers {
            table.observe(name).number = number;
        }
        table
    }

    #[test]
    fn maximum_wins() {
        let peers = table(&[("b1", Some(10)), ("b3", Some(30))]);
        assert_eq!(tally(50, &peers, 2), Tally::Decided { leader: true });
        assert_eq!(tally(20, &peers, 2), Tally::Decided { leader: false });
    }

    #[test]
    fn waits_for_every_expected_peer() {
        let peers = table(&[("b1", Some(10)), ("b3", None)]);
        assert_eq!(tally(50, &peers, 2), Tally::Pending { known: 1 });
    }

    #[test]
    fn equal_number_is_a_collision() {
        let peers = table(&[("b1", Some(42)), ("b3", Some(30))]);
        assert_eq!(
            tally(42, &peers, 2),
            Tally::Collision {
                with: "b1".to_owned()
            }
        );
    }

    #[test]
    fn collisions_between_others_are_not_ours() {
        let peers = table(&[("b1", Some(42)), ("b2", Some(42))]);
        assert_eq!(tally(30, &peers, 2), Tally::Decided { leader: false });
    }

    #[test]
    fn extremes_are_ordinary_numbers() {
        let peers = table(&[("b1", Some(i64::MIN)), ("b2", Some(0))]);
        assert_eq!(tally(i64::MAX, &peers, 2), Tally::Decided { leader: true });
    }

    #[test]
    fn scripted_numbers_replay_then_fall_back() {
        let mut source = ScriptedTieBreaker::new([7, 7]);
        assert_eq!(source.draw(), 7);
        assert_eq!(source.draw(), 7);
        let a = source.draw();
        let mut again = ScriptedTieBreaker::new([]);
        assert_eq!(again.draw(), a);
    }

    #[test]
    fn seeded_sources_are_reproducible() {
        let mut a = RandomTieBreaker::seeded(9);
        let mut b = RandomTieBreaker::seeded(9);
        assert_eq!(a.draw(), b.draw());
    }
}
