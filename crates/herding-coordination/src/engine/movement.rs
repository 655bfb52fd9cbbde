//! Pending intents and per-state movement.
//!
//! Movement is a greedy single step toward the current goal, deflected
//! around known obstacles by the map planner. Agents without a map, or
//! without a goal, skip.

use std::collections::VecDeque;

use herding_types::{Action, AgentState, CoordinationMessage, Position};
use herding_world::is_near_checkpoint;
use tracing::{debug, info, warn};

use super::Engine;

/// The agent's current destination plus any queued after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingIntent {
    current: Option<Position>,
    queue: VecDeque<Position>,
}

impl PendingIntent {
    /// The destination being walked to.
    pub const fn current(&self) -> Option<Position> {
        self.current
    }

    /// Whether `target` is the current or a queued destination.
    pub fn contains(&self, target: Position) -> bool {
        self.current == Some(target) || self.queue.contains(&target)
    }

    /// Add a destination. Returns `false` if it was already pending.
    pub fn push(&mut self, target: Position) -> bool {
        if self.contains(target) {
            return false;
        }
        if self.current.is_none() {
            self.current = Some(target);
        } else {
            self.queue.push_back(target);
        }
        true
    }

    /// Drop the current destination and move to the next queued one.
    pub fn advance(&mut self) -> Option<Position> {
        self.current = self.queue.pop_front();
        self.current
    }

    /// Drop every destination.
    pub fn clear(&mut self) {
        self.current = None;
        self.queue.clear();
    }

    /// Number of pending destinations.
    pub fn len(&self) -> usize {
        self.queue.len().saturating_add(usize::from(self.current.is_some()))
    }

    /// Whether nothing is pending.
    pub const fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}

impl Engine {
    /// Movement for the current state.
    pub(super) fn next_action(&mut self) -> Action {
        match self.state {
            AgentState::Idle => self.idle_walk(),
            AgentState::Scouting => self.scout_step(),
            AgentState::Walking => self.walk_step(),
            AgentState::Init
            | AgentState::Ready
            | AgentState::Waiting
            | AgentState::Finished
            | AgentState::Terminated => Action::Skip,
        }
    }

    /// Tour the checkpoints in order; finish after the last.
    fn idle_walk(&mut self) -> Action {
        let Some(position) = self.position else {
            return Action::Skip;
        };
        match self.next_checkpoint(position) {
            Some(checkpoint) => self.plan(position, checkpoint),
            None => {
                info!(agent = %self.name, "checkpoint tour complete");
                self.transition(AgentState::Finished);
                Action::Skip
            }
        }
    }

    /// Follow the border until a fence is seen, then report it and wait.
    fn scout_step(&mut self) -> Action {
        let Some(position) = self.position else {
            return Action::Skip;
        };
        let Some(found) = self.map.as_ref().map(|map| {
            map.find_feature_switches()
                .into_iter()
                .find_map(|switch| map.fence_at_switch(switch))
        }) else {
            warn!(agent = %self.name, "no map yet, scout skipping");
            return Action::Skip;
        };

        if let Some(record) = found {
            info!(
                agent = %self.name,
                switch = %record.switch_position,
                direction = %record.direction,
                opened = record.opened,
                "fence found"
            );
            self.fence = Some(record);
            self.report(CoordinationMessage::FoundFence(record));
            self.transition(AgentState::Waiting);
            return Action::Skip;
        }

        if self.next_checkpoint(position).is_none() {
            info!(agent = %self.name, "border swept without finding a fence");
            self.transition(AgentState::Finished);
            return Action::Skip;
        }

        self.map.as_ref().map_or(Action::Skip, |map| {
            let heading = map.scout_heading(position);
            if map.is_blocked(position.step(heading)) {
                map.plan_single_step(position, position.step(heading))
            } else {
                heading
            }
        })
    }

    /// Step toward the pending intent; report on arrival.
    fn walk_step(&mut self) -> Action {
        let Some(position) = self.position else {
            return Action::Skip;
        };
        loop {
            let Some(target) = self.intent.current() else {
                return Action::Skip;
            };
            if !self.arrived(position, target) {
                return self.plan(position, target);
            }
            if let Some(next) = self.intent.advance() {
                debug!(agent = %self.name, reached = %target, next = %next, "waypoint reached");
                continue;
            }

            info!(agent = %self.name, target = %target, position = %position, "destination reached");
            self.broadcast(CoordinationMessage::MyPosition(position));
            if self.leader == Some(true) {
                self.waypoint_reached = true;
            }
            let next = if self.scout {
                AgentState::Waiting
            } else {
                AgentState::Idle
            };
            self.transition(next);
            return Action::Skip;
        }
    }

    /// At the target, or next to it when it is known to be blocked.
    fn arrived(&self, position: Position, target: Position) -> bool {
        position == target
            || (position.distance(target) == 1
                && self.map.as_ref().is_some_and(|m| m.is_blocked(target)))
    }

    /// Mark nearby checkpoints visited and return the first unvisited one.
    fn next_checkpoint(&mut self, position: Position) -> Option<Position> {
        let radius = self.config.checkpoint_radius;
        for (checkpoint, visited) in self.config.checkpoints.iter().zip(self.visited.iter_mut()) {
            if !*visited && is_near_checkpoint(position, *checkpoint, radius) {
                debug!(agent = %self.name, checkpoint = %checkpoint, "checkpoint visited");
                *visited = true;
            }
        }
        self.config
            .checkpoints
            .iter()
            .zip(&self.visited)
            .find(|&(_, visited)| !visited)
            .map(|(checkpoint, _)| *checkpoint)
    }

    fn plan(&self, from: Position, to: Position) -> Action {
        match self.map.as_ref() {
            Some(map) => map.plan_single_step(from, to),
            None => {
                warn!(agent = %self.name, "no map yet, skipping");
                Action::Skip
            }
        }
    }
}
