//! Herding agent entry point.
//!
//! Launches one simulator session per configured agent on a shared tokio
//! runtime. Agents coordinate only through the peer bus: an in-process hub
//! when the whole cohort runs here, or NATS when it is spread over several
//! processes.
//!
//! # Architecture
//!
//! ```text
//! Simulator --(perception)--> Session --> Engine --(action)--> Session --> Simulator
//!                                          |  ^
//!                                  outbox  v  |  inbox
//!                                         Peer bus
//! ```
//!
//! A failed session ends only that agent's participation; it is reported
//! once and the remaining agents keep running.

mod agent;
mod config;
mod error;

use std::path::Path;
use std::sync::Arc;

use herding_bus::{LocalHub, MessageBus, NatsBus};
use herding_coordination::Engine;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::agent::HerdingAgent;
use crate::config::{AgentConfig, BusKind, DEFAULT_CONFIG_PATH};
use crate::error::AgentError;

/// Application entry point.
///
/// Initializes logging, loads `herding.yaml` (or `$HERDING_CONFIG`),
/// builds the bus, then runs every agent's session to completion.
///
/// # Errors
///
/// Returns an error if configuration or bus setup fails. Session failures
/// are logged per agent and do not fail the process.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("herding-agent starting");

    let config = load_config()?;
    info!(
        simulator = %config.simulator.address(),
        agents = ?config.cohort.agents,
        bus = ?config.bus.kind,
        "configuration loaded"
    );

    let engine_config = config.engine_config();
    let hub = LocalHub::new();
    let mut sessions = JoinSet::new();

    for name in &config.cohort.agents {
        let bus: Arc<dyn MessageBus> = match config.bus.kind {
            BusKind::Local => Arc::new(hub.register(name.clone())),
            BusKind::Nats => Arc::new(
                NatsBus::connect(
                    &config.bus.nats_url,
                    &config.bus.subject_prefix,
                    name,
                    config.cohort.agents.clone(),
                )
                .await
                .map_err(AgentError::from)?,
            ),
        };
        let engine = Engine::with_random_numbers(name.clone(), engine_config.clone());
        let simulator = config.simulator.clone();
        let name = name.clone();
        sessions.spawn(async move {
            let result = agent::run(simulator, HerdingAgent::new(engine, bus)).await;
            (name, result)
        });
    }

    info!(agents = sessions.len(), "all agents launched");

    while let Some(joined) = sessions.join_next().await {
        match joined {
            Ok((name, Ok(()))) => info!(agent = %name, "agent finished"),
            Ok((name, Err(e))) => error!(agent = %name, error = %e, "agent stopped"),
            Err(e) => error!(error = %e, "agent task aborted"),
        }
    }

    info!("herding-agent exiting");
    Ok(())
}

/// Load the configuration file, falling back to defaults when the default
/// path does not exist.
fn load_config() -> Result<AgentConfig, AgentError> {
    let explicit = std::env::var("HERDING_CONFIG").ok();
    let path = explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    if explicit.is_none() && !Path::new(path).exists() {
        warn!(path, "no configuration file, using defaults");
        return AgentConfig::parse("").map_err(AgentError::from);
    }
    AgentConfig::from_file(Path::new(path)).map_err(AgentError::from)
}
