//! Configuration loading for the agent binary.
//!
//! The canonical configuration lives in `herding.yaml` (path overridable
//! with `HERDING_CONFIG`). Every field has a default, so a missing section
//! or an empty file yields a runnable local setup: three agents `b1`..`b3`
//! against `localhost:12300` over the in-process bus.

use std::collections::BTreeSet;
use std::path::Path;

use herding_coordination::CoordinationConfig;
use herding_coordination::config::{
    DEFAULT_ANNOUNCE_INTERVAL, DEFAULT_CHECKPOINT_RADIUS, DEFAULT_CHECKPOINTS,
};
use herding_types::Position;
use serde::Deserialize;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "herding.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The values parse but cannot be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level agent configuration, mirroring `herding.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AgentConfig {
    /// Where the simulator listens and how to authenticate.
    #[serde(default)]
    pub simulator: SimulatorConfig,

    /// Agents launched by this process.
    #[serde(default)]
    pub cohort: CohortConfig,

    /// Peer message bus.
    #[serde(default)]
    pub bus: BusConfig,

    /// Coordination tunables.
    #[serde(default)]
    pub coordination: CoordinationSection,
}

impl AgentConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides:
    /// - `HERDING_SIM_HOST` overrides `simulator.host`
    /// - `HERDING_SIM_PORT` overrides `simulator.port`
    /// - `NATS_URL` overrides `bus.nats_url`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override or value is unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// See [`AgentConfig::from_file`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (the process environment in
    /// production).
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("HERDING_SIM_HOST") {
            self.simulator.host = host;
        }
        if let Some(port) = lookup("HERDING_SIM_PORT") {
            self.simulator.port = port
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("invalid HERDING_SIM_PORT: {e}")))?;
        }
        if let Some(url) = lookup("NATS_URL") {
            self.bus.nats_url = url;
        }
        Ok(())
    }

    /// Reject configurations that cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cohort.agents.is_empty() {
            return Err(ConfigError::Invalid("cohort.agents is empty".to_owned()));
        }
        let mut seen = BTreeSet::new();
        for name in &self.cohort.agents {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("agent names must not be blank".to_owned()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::Invalid(format!("agent {name:?} listed twice")));
            }
        }
        if self.coordination.checkpoints.is_empty() {
            return Err(ConfigError::Invalid(
                "coordination.checkpoints is empty".to_owned(),
            ));
        }
        Ok(())
    }

    /// Engine configuration for this cohort.
    pub fn engine_config(&self) -> CoordinationConfig {
        CoordinationConfig {
            expected_peers: self.cohort.agents.len().saturating_sub(1),
            checkpoints: self.coordination.checkpoints.clone(),
            checkpoint_radius: self.coordination.checkpoint_radius,
            announce_interval: self.coordination.announce_interval,
        }
    }
}

/// Simulator connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulatorConfig {
    /// Simulator host name.
    #[serde(default = "default_host")]
    pub host: String,

    /// Simulator TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Password shared by every agent of the cohort.
    #[serde(default = "default_password")]
    pub password: String,
}

impl SimulatorConfig {
    /// `host:port` for connecting.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            password: default_password(),
        }
    }
}

/// The agents this process runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CohortConfig {
    /// Agent names, which double as simulator user names.
    #[serde(default = "default_agents")]
    pub agents: Vec<String>,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            agents: default_agents(),
        }
    }
}

/// Which bus implementation carries peer messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    /// In-process hub; all agents must run in this process.
    #[default]
    Local,
    /// NATS server, one subject per agent.
    Nats,
}

/// Peer message bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BusConfig {
    /// Bus implementation.
    #[serde(default)]
    pub kind: BusKind,

    /// NATS server URL, used when `kind` is `nats`.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Subject prefix; agent `b1` listens on `<prefix>.b1`.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            kind: BusKind::default(),
            nats_url: default_nats_url(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

/// Coordination tunables as written in the file. The expected peer count
/// is derived from the cohort.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CoordinationSection {
    /// Checkpoint tour.
    #[serde(default = "default_checkpoints")]
    pub checkpoints: Vec<Position>,

    /// Chebyshev radius within which a checkpoint counts as visited.
    #[serde(default = "default_checkpoint_radius")]
    pub checkpoint_radius: u32,

    /// Cycles between `myNumber` re-announcements while electing.
    #[serde(default = "default_announce_interval")]
    pub announce_interval: u32,
}

impl Default for CoordinationSection {
    fn default() -> Self {
        Self {
            checkpoints: default_checkpoints(),
            checkpoint_radius: default_checkpoint_radius(),
            announce_interval: default_announce_interval(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_owned()
}

const fn default_port() -> u16 {
    12300
}

fn default_password() -> String {
    "1".to_owned()
}

fn default_agents() -> Vec<String> {
    vec!["b1".to_owned(), "b2".to_owned(), "b3".to_owned()]
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_subject_prefix() -> String {
    "herding.agent".to_owned()
}

fn default_checkpoints() -> Vec<Position> {
    DEFAULT_CHECKPOINTS.to_vec()
}

const fn default_checkpoint_radius() -> u32 {
    DEFAULT_CHECKPOINT_RADIUS
}

const fn default_announce_interval() -> u32 {
    DEFAULT_ANNOUNCE_INTERVAL
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn parse_without_env(yaml: &str) -> AgentConfig {
        serde_yml::from_str(yaml).unwrap()
    }

    #[test]
    fn defaults_describe_the_local_three_agent_setup() {
        let config = AgentConfig::default();
        assert_eq!(config.simulator.address(), "localhost:12300");
        assert_eq!(config.cohort.agents, ["b1", "b2", "b3"]);
        assert_eq!(config.bus.kind, BusKind::Local);
        assert_eq!(config.engine_config().expected_peers, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let config = parse_without_env(
            r"
simulator:
  host: sim.example
  port: 12400
  password: secret
cohort:
  agents: [a1, a2, a3, a4]
bus:
  kind: nats
  nats_url: nats://bus:4222
  subject_prefix: cows
coordination:
  checkpoints:
    - { x: 1, y: 1 }
    - { x: 40, y: 40 }
  checkpoint_radius: 2
  announce_interval: 0
",
        );
        assert_eq!(config.simulator.address(), "sim.example:12400");
        assert_eq!(config.simulator.password, "secret");
        assert_eq!(config.bus.kind, BusKind::Nats);
        assert_eq!(config.bus.subject_prefix, "cows");

        let engine = config.engine_config();
        assert_eq!(engine.expected_peers, 3);
        assert_eq!(engine.checkpoints, [Position::new(1, 1), Position::new(40, 40)]);
        assert_eq!(engine.checkpoint_radius, 2);
        assert_eq!(engine.announce_interval, 0);
    }

    #[test]
    fn missing_sections_take_defaults() {
        let config = parse_without_env("simulator:\n  port: 9999\n");
        assert_eq!(config.simulator.host, "localhost");
        assert_eq!(config.simulator.port, 9999);
        assert_eq!(config.cohort, CohortConfig::default());
        assert_eq!(config.coordination, CoordinationSection::default());
    }

    #[test]
    fn overrides_replace_infrastructure_values() {
        let env: BTreeMap<&str, &str> = [
            ("HERDING_SIM_HOST", "10.0.0.5"),
            ("HERDING_SIM_PORT", "12301"),
            ("NATS_URL", "nats://other:4222"),
        ]
        .into_iter()
        .collect();
        let mut config = AgentConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| (*v).to_owned()))
            .unwrap();
        assert_eq!(config.simulator.address(), "10.0.0.5:12301");
        assert_eq!(config.bus.nats_url, "nats://other:4222");
    }

    #[test]
    fn bad_port_override_is_rejected() {
        let mut config = AgentConfig::default();
        let err = config
            .apply_overrides(|key| (key == "HERDING_SIM_PORT").then(|| "lots".to_owned()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn duplicate_or_missing_agents_are_invalid() {
        let mut config = AgentConfig::default();
        config.cohort.agents = vec!["b1".to_owned(), "b1".to_owned()];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.cohort.agents.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let err = serde_yml::from_str::<AgentConfig>("cohort: [").map_err(ConfigError::from);
        assert!(matches!(err, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let err = AgentConfig::from_file(Path::new("/nonexistent/herding.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
