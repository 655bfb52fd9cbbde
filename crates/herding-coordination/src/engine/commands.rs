//! Leader-side command emission and fence handling.
//!
//! Commands are derived every cycle from the last-known peer states, so a
//! lost command is re-sent on a later cycle and a duplicate state report
//! only ever repeats a command the peer treats idempotently.

use herding_types::{AgentState, CoordinationMessage, FeatureRecord};
use tracing::{debug, info};

use super::Engine;
use crate::peers::PeerInfo;

impl Engine {
    /// Issue the command each peer's last-known state calls for.
    pub(super) fn send_commands(&mut self) {
        let fence_known = self.fence.is_some();
        let others_settled = self.waypoint_reached
            && self
                .peers
                .iter()
                .filter(|p| p.scout != Some(true))
                .all(PeerInfo::waypoint_settled);

        let commands: Vec<(String, CoordinationMessage)> = self
            .peers
            .iter()
            .filter_map(|peer| {
                command_for(peer, fence_known, others_settled).map(|c| (peer.name.clone(), c))
            })
            .collect();

        for (peer, command) in commands {
            debug!(agent = %self.name, peer = %peer, kind = command.type_tag(), "command");
            self.send(&peer, command);
        }
    }

    /// Terminate the cohort once self and every peer have finished.
    pub(super) fn check_termination(&mut self) {
        if self.state == AgentState::Finished
            && self
                .peers
                .all_in_state(AgentState::Finished, self.config.expected_peers)
        {
            info!(agent = %self.name, "cohort finished, terminating");
            self.broadcast(CoordinationMessage::Terminate);
            self.transition(AgentState::Terminated);
        }
    }

    /// A peer found a fence: hand out waypoints and walk past it ourselves.
    ///
    /// The scout is sent just past the switch, everyone else behind the
    /// fence. Only the first fence reported is acted on.
    pub(super) fn on_found_fence(&mut self, sender: &str, record: FeatureRecord) {
        if let Some(known) = self.fence {
            if known != record {
                debug!(agent = %self.name, from = %sender, "second fence reported, ignoring");
            }
            return;
        }

        let after = record.position_after_switch();
        let behind = record.position_behind_fence();
        info!(
            agent = %self.name,
            from = %sender,
            switch = %record.switch_position,
            direction = %record.direction,
            after = %after,
            behind = %behind,
            "fence reported"
        );

        self.fence = Some(record);
        for peer in self.peers.iter_mut() {
            peer.waypoint = Some(if peer.scout == Some(true) { after } else { behind });
            peer.waypoint_reached = false;
        }
        self.waypoint_reached = false;
        self.intent.push(behind);
        self.transition(AgentState::Walking);
    }
}

/// The command a peer's last-known state warrants, if any.
fn command_for(
    peer: &PeerInfo,
    fence_known: bool,
    others_settled: bool,
) -> Option<CoordinationMessage> {
    use AgentState::{Idle, Ready, Terminated, Waiting, Walking};

    let state = peer.state?;
    let scout = peer.scout == Some(true);

    if let Some(waypoint) = peer.waypoint.filter(|_| !peer.waypoint_reached) {
        return (!matches!(state, Walking | Terminated)).then_some(CoordinationMessage::Goto(waypoint));
    }
    match state {
        Ready | Idle if scout && !fence_known => Some(CoordinationMessage::Scout),
        Ready if !scout => Some(CoordinationMessage::IdleWalk),
        Waiting if scout && fence_known && others_settled => Some(CoordinationMessage::IdleWalk),
        _ => None,
    }
}
