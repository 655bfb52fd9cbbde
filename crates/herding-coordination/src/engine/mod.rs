//! The per-agent coordination engine.
//!
//! One [`Engine`] runs inside each agent. Every cycle the session hands it
//! the current perception and the drained bus inbox; it answers with exactly
//! one action and any messages to push onto the bus.
//!
//! Cycle order:
//!
//! 1. Record own position and refresh the map.
//! 2. Apply inbox messages in the order drained.
//! 3. While in `init`, advance the election.
//! 4. If leader, issue state-conditioned commands and check for cohort
//!    termination.
//! 5. Pick the movement action for the current state.
//! 6. Every `announce_interval` quiet cycles, repeat the own state (and an
//!    unanswered fence report) so a lost message is eventually replaced.
//!
//! # Submodules
//!
//! - [`commands`] -- Leader-side command emission and fence handling.
//! - [`movement`] -- Pending intents and per-state movement.

pub mod commands;
pub mod movement;

use std::mem;

use herding_types::{
    Action, AgentState, CoordinationMessage, Envelope, FeatureRecord, Perception, Position,
    SimStart,
};
use herding_world::WorldMap;
use tracing::{debug, info, warn};

use crate::config::CoordinationConfig;
use crate::election::{RandomTieBreaker, Tally, TieBreaker, tally};
use crate::peers::PeerTable;

pub use movement::PendingIntent;

/// Where an outgoing message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every peer except self.
    All,
    /// One named peer.
    Peer(String),
}

/// A message the engine wants sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    /// Destination.
    pub to: Recipient,
    /// Payload.
    pub message: CoordinationMessage,
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// The action to reply with.
    pub action: Action,
    /// Messages to push onto the bus, in order.
    pub outbox: Vec<Outgoing>,
}

/// Coordination state of one agent.
pub struct Engine {
    name: String,
    config: CoordinationConfig,
    tie_breaker: Box<dyn TieBreaker>,
    state: AgentState,
    my_number: Option<i64>,
    leader: Option<bool>,
    scout: bool,
    peers: PeerTable,
    map: Option<WorldMap>,
    position: Option<Position>,
    intent: PendingIntent,
    fence: Option<FeatureRecord>,
    visited: Vec<bool>,
    waypoint_reached: bool,
    fence_acknowledged: bool,
    cycles_since_announce: u32,
    outbox: Vec<Outgoing>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("my_number", &self.my_number)
            .field("leader", &self.leader)
            .field("scout", &self.scout)
            .field("peers", &self.peers.len())
            .field("intent", &self.intent)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine drawing election numbers from `tie_breaker`.
    pub fn new(
        name: impl Into<String>,
        config: CoordinationConfig,
        tie_breaker: Box<dyn TieBreaker>,
    ) -> Self {
        let visited = vec![false; config.checkpoints.len()];
        Self {
            name: name.into(),
            config,
            tie_breaker,
            state: AgentState::Init,
            my_number: None,
            leader: None,
            scout: false,
            peers: PeerTable::new(),
            map: None,
            position: None,
            intent: PendingIntent::default(),
            fence: None,
            visited,
            waypoint_reached: false,
            fence_acknowledged: false,
            cycles_since_announce: 0,
            outbox: Vec::new(),
        }
    }

    /// Create an engine with OS-seeded random election numbers.
    pub fn with_random_numbers(name: impl Into<String>, config: CoordinationConfig) -> Self {
        Self::new(name, config, Box::new(RandomTieBreaker::from_os_rng()))
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// This agent's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state.
    pub const fn state(&self) -> AgentState {
        self.state
    }

    /// Election number for the current epoch, once drawn.
    pub const fn my_number(&self) -> Option<i64> {
        self.my_number
    }

    /// Own leader flag: unknown until the election is decided.
    pub const fn is_leader(&self) -> Option<bool> {
        self.leader
    }

    /// Whether this agent has been told to scout.
    pub const fn is_scout(&self) -> bool {
        self.scout
    }

    /// Last-known view of the peers.
    pub const fn peers(&self) -> &PeerTable {
        &self.peers
    }

    /// The map, once the grid dimensions are known.
    pub const fn map(&self) -> Option<&WorldMap> {
        self.map.as_ref()
    }

    /// Current movement goal.
    pub const fn intent(&self) -> &PendingIntent {
        &self.intent
    }

    /// The fence this agent knows about, if any.
    pub const fn fence(&self) -> Option<FeatureRecord> {
        self.fence
    }

    /// Own position as of the last perception.
    pub const fn position(&self) -> Option<Position> {
        self.position
    }

    // -----------------------------------------------------------------------
    // Session events
    // -----------------------------------------------------------------------

    /// A match begins: size the map to the announced grid.
    pub fn on_sim_start(&mut self, start: &SimStart) {
        match WorldMap::new(start.grid_width, start.grid_height) {
            Ok(map) => {
                info!(
                    agent = %self.name,
                    width = start.grid_width,
                    height = start.grid_height,
                    "map created"
                );
                self.map = Some(map);
            }
            Err(e) => {
                warn!(agent = %self.name, error = %e, "cannot create map, movement disabled");
                self.map = None;
            }
        }
    }

    /// Run one cycle.
    pub fn step(&mut self, perception: &Perception, inbox: Vec<Envelope>) -> Decision {
        if self.state.is_terminal() {
            if !inbox.is_empty() {
                debug!(agent = %self.name, dropped = inbox.len(), "terminated, ignoring messages");
            }
            return Decision {
                action: Action::Skip,
                outbox: Vec::new(),
            };
        }

        self.position = Some(perception.position);
        if let Some(map) = self.map.as_mut() {
            let written = map.refresh(perception.position, &perception.cells);
            debug!(agent = %self.name, step = perception.step, written, "map refreshed");
        }

        for envelope in inbox {
            self.handle(envelope);
            if self.state.is_terminal() {
                break;
            }
        }

        if self.state == AgentState::Init {
            self.advance_election();
        }

        if self.leader == Some(true) && self.state != AgentState::Init {
            self.send_commands();
            self.check_termination();
        }

        let action = self.next_action();
        self.keep_alive();
        debug!(
            agent = %self.name,
            step = perception.step,
            state = %self.state,
            action = %action,
            "cycle decided"
        );
        Decision {
            action,
            outbox: mem::take(&mut self.outbox),
        }
    }

    // -----------------------------------------------------------------------
    // Inbox
    // -----------------------------------------------------------------------

    fn handle(&mut self, envelope: Envelope) {
        let Envelope { sender, message } = envelope;
        if sender == self.name {
            return;
        }
        if message == CoordinationMessage::Reset {
            info!(agent = %self.name, from = %sender, "reset received");
            self.reset();
            return;
        }

        if message.is_leader_command() {
            self.handle_command(&sender, message);
            return;
        }

        let peer = self.peers.observe(&sender);
        match message {
            CoordinationMessage::MyNumber(number) => {
                peer.number = Some(number);
                // A peer still electing may have missed our announcement.
                if let Some(mine) = self.my_number.filter(|_| self.state != AgentState::Init) {
                    self.send(&sender, CoordinationMessage::MyNumber(mine));
                }
            }
            CoordinationMessage::Leader(flag) => peer.leader = Some(flag),
            CoordinationMessage::MyState(state) => peer.state = Some(state),
            CoordinationMessage::MyPosition(position) => {
                peer.position = Some(position);
                if peer.waypoint.is_some_and(|w| w.distance(position) <= 1) {
                    peer.waypoint_reached = true;
                }
            }
            CoordinationMessage::FoundFence(record) => {
                if self.leader == Some(true) {
                    self.on_found_fence(&sender, record);
                } else if self.fence.is_none() {
                    self.fence = Some(record);
                }
            }
            CoordinationMessage::Reset
            | CoordinationMessage::Goto(_)
            | CoordinationMessage::Scout
            | CoordinationMessage::IdleWalk
            | CoordinationMessage::Terminate => {}
        }
    }

    fn handle_command(&mut self, sender: &str, message: CoordinationMessage) {
        let peer = self.peers.observe(sender);
        if peer.is_known_follower() {
            debug!(agent = %self.name, from = %sender, kind = message.type_tag(), "ignoring command from follower");
            return;
        }
        if self.leader == Some(true) {
            warn!(agent = %self.name, from = %sender, kind = message.type_tag(), "leader received a command, ignoring");
            return;
        }
        if self.leader.is_none() {
            // Only a peer that outnumbers us this epoch can have won.
            let outranks = matches!(
                (self.my_number, peer.number),
                (Some(mine), Some(theirs)) if theirs > mine
            );
            if !outranks {
                debug!(
                    agent = %self.name,
                    from = %sender,
                    kind = message.type_tag(),
                    "command from unconfirmed leader, ignoring"
                );
                return;
            }
            info!(agent = %self.name, leader = %sender, "adopting leader from its commands");
            peer.leader = Some(true);
            self.leader = Some(false);
        } else if peer.leader.is_none() {
            peer.leader = Some(true);
        }

        match message {
            CoordinationMessage::Goto(target) => {
                self.fence_acknowledged = true;
                if self.intent.push(target) {
                    info!(agent = %self.name, target = %target, "goto accepted");
                }
                self.transition(AgentState::Walking);
            }
            CoordinationMessage::Scout => {
                self.scout = true;
                self.transition(AgentState::Scouting);
            }
            CoordinationMessage::IdleWalk => {
                self.intent.clear();
                self.transition(AgentState::Idle);
            }
            CoordinationMessage::Terminate => {
                self.intent.clear();
                self.transition(AgentState::Terminated);
            }
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Election
    // -----------------------------------------------------------------------

    fn advance_election(&mut self) {
        let Some(mine) = self.my_number else {
            let number = self.tie_breaker.draw();
            self.my_number = Some(number);
            self.cycles_since_announce = 0;
            info!(agent = %self.name, number, "election number drawn");
            self.broadcast(CoordinationMessage::MyNumber(number));
            return;
        };

        match tally(mine, &self.peers, self.config.expected_peers) {
            Tally::Pending { known } => {
                self.cycles_since_announce = self.cycles_since_announce.saturating_add(1);
                let interval = self.config.announce_interval;
                if interval > 0 && self.cycles_since_announce >= interval {
                    debug!(agent = %self.name, known, "numbers missing, re-announcing");
                    self.cycles_since_announce = 0;
                    self.broadcast(CoordinationMessage::MyNumber(mine));
                }
            }
            Tally::Collision { with } => {
                info!(agent = %self.name, number = mine, with = %with, "number collision, resetting cohort");
                self.broadcast(CoordinationMessage::Reset);
                self.reset();
            }
            Tally::Decided { leader } => {
                self.leader = Some(leader);
                info!(agent = %self.name, number = mine, leader, "election decided");
                self.broadcast(CoordinationMessage::Leader(leader));
                if leader {
                    self.assign_roles();
                    self.transition(AgentState::Idle);
                } else {
                    self.transition(AgentState::Ready);
                }
            }
        }
    }

    /// The first peer discovered scouts; everyone else follows.
    fn assign_roles(&mut self) {
        let scout = self.peers.first_discovered().map(|p| p.name.clone());
        for peer in self.peers.iter_mut() {
            peer.scout = Some(Some(&peer.name) == scout.as_ref());
        }
        if let Some(scout) = scout {
            info!(agent = %self.name, scout = %scout, "scout assigned");
        }
    }

    /// Clear election, role and movement state and return to `init`.
    fn reset(&mut self) {
        self.my_number = None;
        self.leader = None;
        self.scout = false;
        self.peers.clear();
        if let Some(map) = self.map.as_mut() {
            map.reset();
        }
        self.intent.clear();
        self.fence = None;
        self.visited.iter_mut().for_each(|v| *v = false);
        self.waypoint_reached = false;
        self.fence_acknowledged = false;
        self.cycles_since_announce = 0;
        self.transition(AgentState::Init);
    }

    /// Repeat the own state once `announce_interval` cycles pass without a
    /// change; a scout still waiting for its `goto` repeats the fence too.
    fn keep_alive(&mut self) {
        if self.state == AgentState::Init || self.state.is_terminal() {
            return;
        }
        self.cycles_since_announce = self.cycles_since_announce.saturating_add(1);
        let interval = self.config.announce_interval;
        if interval == 0 || self.cycles_since_announce < interval {
            return;
        }
        self.cycles_since_announce = 0;
        debug!(agent = %self.name, state = %self.state, "repeating state");
        self.broadcast(CoordinationMessage::MyState(self.state));

        let unanswered = self.fence.filter(|_| {
            self.scout && self.state == AgentState::Waiting && !self.fence_acknowledged
        });
        if let Some(record) = unanswered {
            debug!(agent = %self.name, "fence report unanswered, repeating");
            self.report(CoordinationMessage::FoundFence(record));
        }
    }

    // -----------------------------------------------------------------------
    // Outbox
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: AgentState) {
        if self.state == next {
            return;
        }
        info!(agent = %self.name, from = %self.state, to = %next, "state transition");
        self.state = next;
        self.cycles_since_announce = 0;
        self.broadcast(CoordinationMessage::MyState(next));
    }

    fn broadcast(&mut self, message: CoordinationMessage) {
        self.outbox.push(Outgoing {
            to: Recipient::All,
            message,
        });
    }

    fn send(&mut self, peer: &str, message: CoordinationMessage) {
        self.outbox.push(Outgoing {
            to: Recipient::Peer(peer.to_owned()),
            message,
        });
    }

    /// Send to the leader if known, otherwise to everyone.
    fn report(&mut self, message: CoordinationMessage) {
        match self.peers.leader().map(str::to_owned) {
            Some(leader) => self.send(&leader, message),
            None => self.broadcast(message),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use herding_types::CellPercept;

    use super::*;
    use crate::election::ScriptedTieBreaker;

    pub(super) fn engine(name: &str, numbers: &[i64]) -> Engine {
        Engine::new(
            name,
            CoordinationConfig::default(),
            Box::new(ScriptedTieBreaker::new(numbers.iter().copied())),
        )
    }

    pub(super) fn perception(x: i32, y: i32) -> Perception {
        Perception {
            id: "p".to_owned(),
            position: Position::new(x, y),
            step: 0,
            cows_in_corral: 0,
            cells: vec![CellPercept::new(0, 0, vec![herding_types::CellContent::Empty])],
        }
    }

    pub(super) fn from(sender: &str, message: CoordinationMessage) -> Envelope {
        Envelope::new(sender, message)
    }

    fn broadcasts(decision: &Decision) -> Vec<CoordinationMessage> {
        decision
            .outbox
            .iter()
            .filter(|o| o.to == Recipient::All)
            .map(|o| o.message)
            .collect()
    }

    #[test]
    fn first_cycle_draws_and_broadcasts() {
        let mut e = engine("b1", &[10]);
        let d = e.step(&perception(5, 5), Vec::new());
        assert_eq!(d.action, Action::Skip);
        assert_eq!(broadcasts(&d), [CoordinationMessage::MyNumber(10)]);
        assert_eq!(e.my_number(), Some(10));
        assert_eq!(e.state(), AgentState::Init);
    }

    #[test]
    fn maximum_becomes_leader_and_idles() {
        let mut e = engine("b2", &[50]);
        e.step(&perception(5, 5), Vec::new());
        let d = e.step(
            &perception(5, 5),
            vec![
                from("b1", CoordinationMessage::MyNumber(10)),
                from("b3", CoordinationMessage::MyNumber(30)),
            ],
        );
        assert_eq!(e.is_leader(), Some(true));
        assert_eq!(e.state(), AgentState::Idle);
        assert_eq!(
            broadcasts(&d)[..2],
            [
                CoordinationMessage::Leader(true),
                CoordinationMessage::MyState(AgentState::Idle)
            ]
        );
        assert_eq!(e.peers().get("b1").unwrap().scout, Some(true));
        assert_eq!(e.peers().get("b3").unwrap().scout, Some(false));
    }

    #[test]
    fn follower_becomes_ready() {
        let mut e = engine("b1", &[10]);
        e.step(&perception(5, 5), Vec::new());
        e.step(
            &perception(5, 5),
            vec![
                from("b2", CoordinationMessage::MyNumber(50)),
                from("b3", CoordinationMessage::MyNumber(30)),
            ],
        );
        assert_eq!(e.is_leader(), Some(false));
        assert_eq!(e.state(), AgentState::Ready);
    }

    #[test]
    fn collision_broadcasts_reset_and_redraws_next_cycle() {
        let mut e = engine("b1", &[42, 7]);
        e.step(&perception(5, 5), Vec::new());
        let d = e.step(
            &perception(5, 5),
            vec![
                from("b2", CoordinationMessage::MyNumber(42)),
                from("b3", CoordinationMessage::MyNumber(30)),
            ],
        );
        assert_eq!(broadcasts(&d), [CoordinationMessage::Reset]);
        assert_eq!(e.my_number(), None);
        assert!(e.peers().is_empty());
        let d = e.step(&perception(5, 5), Vec::new());
        assert_eq!(broadcasts(&d), [CoordinationMessage::MyNumber(7)]);
    }

    #[test]
    fn reset_clears_intent_and_returns_to_init() {
        let mut e = engine("b1", &[10, 11]);
        e.step(&perception(5, 5), Vec::new());
        e.step(
            &perception(5, 5),
            vec![
                from("b2", CoordinationMessage::MyNumber(50)),
                from("b3", CoordinationMessage::MyNumber(30)),
                from("b2", CoordinationMessage::Goto(Position::new(9, 9))),
            ],
        );
        assert_eq!(e.state(), AgentState::Walking);
        assert_eq!(e.intent().current(), Some(Position::new(9, 9)));

        let d = e.step(&perception(5, 5), vec![from("b3", CoordinationMessage::Reset)]);
        assert_eq!(e.state(), AgentState::Init);
        assert!(e.intent().is_empty());
        assert_eq!(e.is_leader(), None);
        assert_eq!(
            broadcasts(&d),
            [
                CoordinationMessage::MyState(AgentState::Init),
                CoordinationMessage::MyNumber(11)
            ]
        );
    }

    #[test]
    fn re_announces_while_numbers_are_missing() {
        let mut e = Engine::new(
            "b1",
            CoordinationConfig {
                announce_interval: 2,
                ..CoordinationConfig::default()
            },
            Box::new(ScriptedTieBreaker::new([10])),
        );
        e.step(&perception(5, 5), Vec::new());
        assert!(broadcasts(&e.step(&perception(5, 5), Vec::new())).is_empty());
        assert_eq!(
            broadcasts(&e.step(&perception(5, 5), Vec::new())),
            [CoordinationMessage::MyNumber(10)]
        );
    }

    #[test]
    fn commands_from_known_followers_are_ignored() {
        let mut e = engine("b1", &[10]);
        e.step(&perception(5, 5), Vec::new());
        e.step(
            &perception(5, 5),
            vec![
                from("b3", CoordinationMessage::Leader(false)),
                from("b3", CoordinationMessage::Scout),
            ],
        );
        assert_eq!(e.state(), AgentState::Init);
        assert!(!e.is_scout());
    }

    #[test]
    fn goto_is_idempotent() {
        let mut e = engine("b1", &[10]);
        e.step(&perception(5, 5), Vec::new());
        let target = Position::new(8, 5);
        e.step(
            &perception(5, 5),
            vec![
                from("b2", CoordinationMessage::MyNumber(50)),
                from("b2", CoordinationMessage::Goto(target)),
                from("b2", CoordinationMessage::Goto(target)),
            ],
        );
        assert_eq!(e.intent().len(), 1);
    }

    #[test]
    fn commands_before_the_sender_outnumbers_us_are_ignored() {
        let mut e = engine("b1", &[10]);
        e.step(&perception(5, 5), Vec::new());
        e.step(&perception(5, 5), vec![from("b2", CoordinationMessage::Scout)]);
        assert_eq!(e.state(), AgentState::Init);
        assert_eq!(e.is_leader(), None);

        e.step(
            &perception(5, 5),
            vec![
                from("b3", CoordinationMessage::MyNumber(5)),
                from("b3", CoordinationMessage::Scout),
            ],
        );
        assert_eq!(e.state(), AgentState::Init);

        e.step(
            &perception(5, 5),
            vec![
                from("b2", CoordinationMessage::MyNumber(50)),
                from("b2", CoordinationMessage::Scout),
            ],
        );
        assert_eq!(e.state(), AgentState::Scouting);
        assert_eq!(e.is_leader(), Some(false));
        assert_eq!(e.peers().leader(), Some("b2"));
    }

    #[test]
    fn stale_goto_after_reset_does_not_stop_the_next_election() {
        let mut e = engine("b1", &[10, 11]);
        e.step(&perception(5, 5), Vec::new());
        let d = e.step(
            &perception(5, 5),
            vec![
                from("b3", CoordinationMessage::Reset),
                from("b2", CoordinationMessage::Goto(Position::new(9, 9))),
            ],
        );
        assert_eq!(e.state(), AgentState::Init);
        assert_eq!(e.is_leader(), None);
        assert!(e.intent().is_empty());
        assert_eq!(e.my_number(), Some(11));
        assert!(broadcasts(&d).contains(&CoordinationMessage::MyNumber(11)));

        e.step(
            &perception(5, 5),
            vec![
                from("b2", CoordinationMessage::MyNumber(50)),
                from("b3", CoordinationMessage::MyNumber(30)),
            ],
        );
        assert_eq!(e.is_leader(), Some(false));
        assert_eq!(e.state(), AgentState::Ready);
    }

    #[test]
    fn stale_number_from_before_a_reset_is_overwritten() {
        let mut e = engine("b1", &[10, 40]);
        e.step(&perception(5, 5), Vec::new());
        e.step(
            &perception(5, 5),
            vec![
                from("b3", CoordinationMessage::Reset),
                from("b2", CoordinationMessage::MyNumber(50)),
            ],
        );
        assert_eq!(e.peers().get("b2").unwrap().number, Some(50));
        assert_eq!(e.state(), AgentState::Init);

        e.step(
            &perception(5, 5),
            vec![
                from("b2", CoordinationMessage::MyNumber(20)),
                from("b3", CoordinationMessage::MyNumber(30)),
            ],
        );
        assert_eq!(e.peers().get("b2").unwrap().number, Some(20));
        assert_eq!(e.is_leader(), Some(true));
    }

    #[test]
    fn quiet_agents_repeat_their_state() {
        let mut e = Engine::new(
            "b1",
            CoordinationConfig {
                announce_interval: 3,
                ..CoordinationConfig::default()
            },
            Box::new(ScriptedTieBreaker::new([10])),
        );
        e.step(&perception(5, 5), Vec::new());
        let d = e.step(
            &perception(5, 5),
            vec![
                from("b2", CoordinationMessage::MyNumber(50)),
                from("b3", CoordinationMessage::MyNumber(30)),
            ],
        );
        assert!(broadcasts(&d).contains(&CoordinationMessage::MyState(AgentState::Ready)));
        assert!(broadcasts(&e.step(&perception(5, 5), Vec::new())).is_empty());
        assert_eq!(
            broadcasts(&e.step(&perception(5, 5), Vec::new())),
            [CoordinationMessage::MyState(AgentState::Ready)]
        );
    }

    #[test]
    fn terminated_ignores_everything() {
        let mut e = engine("b1", &[10, 20]);
        e.step(&perception(5, 5), Vec::new());
        e.step(
            &perception(5, 5),
            vec![
                from("b2", CoordinationMessage::MyNumber(50)),
                from("b2", CoordinationMessage::Terminate),
            ],
        );
        assert_eq!(e.state(), AgentState::Terminated);
        let d = e.step(&perception(5, 5), vec![from("b2", CoordinationMessage::Reset)]);
        assert_eq!(e.state(), AgentState::Terminated);
        assert_eq!(d.action, Action::Skip);
        assert!(d.outbox.is_empty());
    }

    #[test]
    fn own_messages_are_ignored() {
        let mut e = engine("b1", &[10]);
        e.step(&perception(5, 5), Vec::new());
        e.step(&perception(5, 5), vec![from("b1", CoordinationMessage::MyNumber(10))]);
        assert!(e.peers().is_empty());
    }

    #[test]
    fn sim_start_sizes_the_map() {
        let mut e = engine("b1", &[10]);
        e.on_sim_start(&SimStart {
            grid_width: 30,
            grid_height: 20,
            line_of_sight: 8,
        });
        assert_eq!(e.map().map(WorldMap::height), Some(20));
        e.step(&perception(5, 5), Vec::new());
        assert_eq!(e.map().unwrap().known_cells(), 1);

        e.on_sim_start(&SimStart {
            grid_width: 0,
            grid_height: 20,
            line_of_sight: 8,
        });
        assert!(e.map().is_none());
    }
}
