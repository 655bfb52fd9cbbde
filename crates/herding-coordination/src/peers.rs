//! Last-known view of every peer in the cohort.
//!
//! Everything here is built from bus traffic and may be stale. It gates
//! which commands the leader issues; nothing safety-critical depends on it.

use std::collections::BTreeMap;

use herding_types::{AgentState, Position};

/// What this agent believes about one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    /// Unique peer name.
    pub name: String,
    /// Rank in discovery order, starting at zero.
    pub discovered: usize,
    /// Election tie-break number for the current epoch.
    pub number: Option<i64>,
    /// Leader flag: unknown until announced.
    pub leader: Option<bool>,
    /// Scout flag, assigned by the leader. Only tracked on the leader.
    pub scout: Option<bool>,
    /// Last reported state.
    pub state: Option<AgentState>,
    /// Last reported position.
    pub position: Option<Position>,
    /// Post-fence waypoint the leader assigned this peer.
    pub waypoint: Option<Position>,
    /// Whether the peer has reported reaching `waypoint`.
    pub waypoint_reached: bool,
}

impl PeerInfo {
    /// A peer nothing is known about yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            discovered: 0,
            number: None,
            leader: None,
            scout: None,
            state: None,
            position: None,
            waypoint: None,
            waypoint_reached: false,
        }
    }

    /// Whether the peer is known to be a follower.
    pub const fn is_known_follower(&self) -> bool {
        matches!(self.leader, Some(false))
    }

    /// Whether the peer's last reported state is one of `states`.
    pub fn state_in(&self, states: &[AgentState]) -> bool {
        self.state.is_some_and(|s| states.contains(&s))
    }

    /// Whether the peer is done with its post-fence waypoint, either by
    /// reporting it or by having finished altogether.
    pub fn waypoint_settled(&self) -> bool {
        self.waypoint_reached || self.state == Some(AgentState::Finished)
    }
}

/// Every peer heard from, keyed by name, remembering the order their first
/// message was processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerTable {
    peers: BTreeMap<String, PeerInfo>,
}

impl PeerTable {
    /// An empty table.
    pub const fn new() -> Self {
        Self {
            peers: BTreeMap::new(),
        }
    }

    /// Look up a peer, recording it at the end of the discovery order if it
    /// is new.
    pub fn observe(&mut self, name: &str) -> &mut PeerInfo {
        let rank = self.peers.len();
        self.peers
            .entry(name.to_owned())
            .or_insert_with(|| PeerInfo {
                discovered: rank,
                ..PeerInfo::new(name)
            })
    }

    /// Look up a peer without recording it.
    pub fn get(&self, name: &str) -> Option<&PeerInfo> {
        self.peers.get(name)
    }

    /// Mutable lookup without recording.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut PeerInfo> {
        self.peers.get_mut(name)
    }

    /// Peers in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &PeerInfo> {
        let mut peers: Vec<_> = self.peers.values().collect();
        peers.sort_unstable_by_key(|p| p.discovered);
        peers.into_iter()
    }

    /// Mutable iteration, in name order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PeerInfo> {
        self.peers.values_mut()
    }

    /// The first peer discovered.
    pub fn first_discovered(&self) -> Option<&PeerInfo> {
        self.peers.values().min_by_key(|p| p.discovered)
    }

    /// Number of known peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether no peer is known.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Forget every peer.
    pub fn clear(&mut self) {
        self.peers.clear();
    }

    /// Numbers known for the current epoch.
    pub fn numbers(&self) -> impl Iterator<Item = (&str, i64)> {
        self.iter()
            .filter_map(|p| p.number.map(|n| (p.name.as_str(), n)))
    }

    /// Name of the peer announced as leader, if any.
    pub fn leader(&self) -> Option<&str> {
        self.peers
            .values()
            .find(|p| p.leader == Some(true))
            .map(|p| p.name.as_str())
    }

    /// Whether every known peer reports `state` and at least `expected`
    /// peers are known.
    pub fn all_in_state(&self, state: AgentState, expected: usize) -> bool {
        self.peers.len() >= expected && self.peers.values().all(|p| p.state == Some(state))
    }
}
