//! auction-sim.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::AuctionRules;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed for the shared random source; entropy when absent.
    pub seed: Option<u64>,
    #[serde(default)]
    pub rules: AuctionRules,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
}

/// Simulated transport behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
    pub timeout_ms: u64,
    /// Probability that a flaky representative drops a call.
    pub flakiness: f64,
    /// How many representatives are flaky.
    pub flaky_reps: usize,
}

impl NetworkConfig {
    pub fn latency_min(&self) -> Duration {
        Duration::from_millis(self.latency_min_ms)
    }

    pub fn latency_max(&self) -> Duration {
        Duration::from_millis(self.latency_max_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            latency_min_ms: 2,
            latency_max_ms: 12,
            timeout_ms: 50,
            flakiness: 0.95,
            flaky_reps: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub reps: usize,
    pub resources_per_rep: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            reps: 100,
            resources_per_rep: 100,
        }
    }
}

/// What gets auctioned and what is already running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub instances: usize,
    /// Instances are spread round-robin over this many applications.
    pub apps: usize,
    pub resources_per_instance: u32,
    /// Instances every non-empty representative already holds.
    pub initial_instances_per_rep: usize,
    /// Representatives that start with nothing.
    pub empty_reps: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            instances: 2000,
            apps: 1000,
            resources_per_instance: 1,
            initial_instances_per_rep: 0,
            empty_reps: 0,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            rules: AuctionRules::default(),
            network: NetworkConfig::default(),
            cluster: ClusterConfig::default(),
            workload: WorkloadConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.cluster.reps == 0 {
            return Err(ConfigError::Invalid("cluster.reps must be positive".into()));
        }
        if self.cluster.resources_per_rep == 0 {
            return Err(ConfigError::Invalid(
                "cluster.resources_per_rep must be positive".into(),
            ));
        }
        if self.workload.resources_per_instance == 0 {
            return Err(ConfigError::Invalid(
                "workload.resources_per_instance must be positive".into(),
            ));
        }
        if self.workload.apps == 0 && self.workload.instances > 0 {
            return Err(ConfigError::Invalid("workload.apps must be positive".into()));
        }
        if self.workload.empty_reps > self.cluster.reps {
            return Err(ConfigError::Invalid(format!(
                "workload.empty_reps ({}) exceeds cluster.reps ({})",
                self.workload.empty_reps, self.cluster.reps
            )));
        }
        if self.network.flaky_reps > self.cluster.reps {
            return Err(ConfigError::Invalid(format!(
                "network.flaky_reps ({}) exceeds cluster.reps ({})",
                self.network.flaky_reps, self.cluster.reps
            )));
        }
        if self.network.latency_min_ms > self.network.latency_max_ms {
            return Err(ConfigError::Invalid(
                "network.latency_min_ms exceeds network.latency_max_ms".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.network.flakiness) {
            return Err(ConfigError::Invalid(
                "network.flakiness must be within [0, 1]".into(),
            ));
        }
        self.rules
            .max_bidding_pool
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("rules.max_bidding_pool: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Algorithm, BiddingPool};

    #[test]
    fn default_config_renders_and_parses_back() {
        let config = SimulationConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("all_revote"));

        let back = SimulationConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn parse_minimal() {
        let toml_str = r#"
seed = 42

[rules]
algorithm = "pick_best"
max_rounds = 10
max_bidding_pool = 0.2
max_concurrent = 5

[cluster]
reps = 30
"#;
        let config = SimulationConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.rules.algorithm, Algorithm::PickBest);
        assert_eq!(config.rules.max_bidding_pool, BiddingPool::Fraction(0.2));
        assert_eq!(config.rules.shortlist_size, 5);
        assert_eq!(config.cluster.reps, 30);
        assert_eq!(config.cluster.resources_per_rep, 100);
        assert_eq!(config.network.timeout(), Duration::from_millis(50));
    }

    #[test]
    fn rejects_unknown_algorithm() {
        let toml_str = r#"
[rules]
algorithm = "dutch"
max_rounds = 10
max_bidding_pool = 5
max_concurrent = 5
"#;
        assert!(matches!(
            SimulationConfig::from_toml_str(toml_str),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_inconsistent_values() {
        let mut config = SimulationConfig::default();
        config.network.latency_min_ms = 100;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SimulationConfig::default();
        config.workload.empty_reps = config.cluster.reps + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SimulationConfig::default();
        config.network.flakiness = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_empty_or_oversized_bidding_pools() {
        for pool in [
            BiddingPool::Count(0),
            BiddingPool::Fraction(1.5),
            BiddingPool::Fraction(-0.2),
            BiddingPool::Fraction(0.0),
        ] {
            let mut config = SimulationConfig::default();
            config.rules.max_bidding_pool = pool;
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "{pool:?} accepted"
            );
        }

        for raw in ["0", "1.5", "-0.2"] {
            let toml = format!(
                "[rules]\nalgorithm = \"pick_best\"\nmax_rounds = 10\nmax_bidding_pool = {raw}\nmax_concurrent = 5\n"
            );
            assert!(
                matches!(
                    SimulationConfig::from_toml_str(&toml),
                    Err(ConfigError::Invalid(_))
                ),
                "{raw} accepted"
            );
        }

        let mut config = SimulationConfig::default();
        config.rules.max_bidding_pool = BiddingPool::Fraction(1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auction-sim.toml");
        std::fs::write(&path, "[cluster]\nreps = 7\n").unwrap();

        let config = SimulationConfig::from_file(&path).unwrap();
        assert_eq!(config.cluster.reps, 7);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SimulationConfig::from_file(Path::new("/nonexistent/auction-sim.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
