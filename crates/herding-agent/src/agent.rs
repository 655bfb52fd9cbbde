//! Glue between the simulator session, the coordination engine and the bus.

use std::sync::Arc;

use chrono::Utc;
use herding_bus::MessageBus;
use herding_coordination::{Engine, Outgoing, Recipient};
use herding_session::{Session, SessionHandler, TracingSink};
use herding_types::{Action, Perception, SimEnd, SimStart};
use tracing::{debug, info, warn};

use crate::config::SimulatorConfig;
use crate::error::AgentError;

/// One agent: an engine whose messages travel over `bus`.
pub struct HerdingAgent {
    engine: Engine,
    bus: Arc<dyn MessageBus>,
}

impl HerdingAgent {
    /// Pair an engine with its bus handle.
    pub const fn new(engine: Engine, bus: Arc<dyn MessageBus>) -> Self {
        Self { engine, bus }
    }

    /// The wrapped engine.
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Hand every outgoing message to the bus. Failures are logged; the bus
    /// is best-effort and the protocol tolerates loss.
    fn publish(&self, outbox: Vec<Outgoing>) {
        for Outgoing { to, message } in outbox {
            let result = match &to {
                Recipient::All => self.bus.broadcast(message),
                Recipient::Peer(peer) => self.bus.send(peer, message),
            };
            if let Err(e) = result {
                warn!(
                    agent = self.bus.name(),
                    kind = message.type_tag(),
                    error = %e,
                    "bus delivery failed"
                );
            }
        }
    }
}

impl SessionHandler for HerdingAgent {
    fn on_authenticated(&mut self) {
        info!(agent = self.engine.name(), "entering perceive-act loop");
    }

    fn on_sim_start(&mut self, start: &SimStart, timestamp: i64) {
        debug!(agent = self.engine.name(), timestamp, "match clock started");
        self.engine.on_sim_start(start);
    }

    fn on_request_action(
        &mut self,
        perception: &Perception,
        timestamp: i64,
        deadline: i64,
    ) -> Action {
        let budget_ms = deadline.saturating_sub(Utc::now().timestamp_millis());
        let inbox = self.bus.take_all();
        debug!(
            agent = self.engine.name(),
            step = perception.step,
            timestamp,
            budget_ms,
            messages = inbox.len(),
            "inbox drained"
        );
        let decision = self.engine.step(perception, inbox);
        self.publish(decision.outbox);
        decision.action
    }

    fn on_sim_end(&mut self, end: &SimEnd, timestamp: i64) {
        info!(
            agent = self.engine.name(),
            timestamp,
            state = %self.engine.state(),
            result = ?end.attributes,
            "match over"
        );
    }
}

/// Connect, authenticate and run `agent` until the simulator hangs up.
///
/// # Errors
///
/// Returns [`AgentError::Session`] on connection, authentication or
/// mid-loop I/O failure.
pub async fn run(simulator: SimulatorConfig, mut agent: HerdingAgent) -> Result<(), AgentError> {
    let name = agent.engine().name().to_owned();
    let mut session = Session::new(name.clone(), Arc::new(TracingSink));
    session.connect(&simulator.address()).await?;
    session.authenticate(&name, &simulator.password).await?;
    session.run_loop(&mut agent).await?;
    info!(
        agent = %name,
        replies = session.replies_sent(),
        state = %agent.engine().state(),
        "session closed"
    );
    Ok(())
}
