//! Serializable experiment configuration.
//!
//! One TOML file describes the model, the exogenous process, the policy, the
//! simulation settings, and optionally a parameter sweep.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use exitlab_core::exogenous::{
    ExogenousProcess, HistoricalProcess, Increment, NoiseModel, Sampling, SyntheticProcess,
};
use exitlab_core::policy::PolicySpec;
use exitlab_core::{Model, SimError};

use crate::data_loader::{load_trajectories, LoadError};
use crate::simulator::{Objective, Simulator};
use crate::sweep::{GridAxis, InvalidCombination, ParamGrid, SweepOptions};

/// Content hash identifying an experiment configuration.
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] SimError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to fingerprint config: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Full experiment description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentConfig {
    pub model: ModelConfig,
    pub process: ProcessConfig,
    pub policy: PolicySpec,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub sweep: Option<SweepConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Final step `T`; the asset is sold at `T` if still held.
    pub horizon: usize,
    pub initial_price: f64,
}

/// Exogenous process configuration (serializable enum).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessConfig {
    Synthetic {
        #[serde(default)]
        noise: NoiseModel,
        #[serde(default)]
        increment: Increment,
        #[serde(default)]
        price_floor: f64,
    },
    /// Path is resolved relative to the config file.
    Historical {
        path: PathBuf,
        #[serde(default)]
        sampling: Sampling,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    #[serde(default = "default_episodes")]
    pub episodes: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)]
    pub objective: Objective,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            episodes: default_episodes(),
            seed: default_seed(),
            parallel: true,
            objective: Objective::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepConfig {
    pub axes: Vec<GridAxis>,
    /// Explicit combinations; when set, `axes` only names the columns.
    #[serde(default)]
    pub points: Option<Vec<Vec<f64>>>,
    #[serde(default = "default_true")]
    pub ordered: bool,
    #[serde(default)]
    pub on_invalid: InvalidCombination,
}

fn default_episodes() -> usize {
    1000
}

fn default_seed() -> u64 {
    42
}

fn default_true() -> bool {
    true
}

impl ExperimentConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file; a relative historical path is taken relative to it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        if let ProcessConfig::Historical { path, .. } = &mut self.process {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Checks that need no I/O: policy kind/params shape, episode count, grid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.episodes == 0 {
            return Err(SimError::InvalidArgument("simulation.episodes must be >= 1".into()).into());
        }
        if self.model.horizon == 0 {
            return Err(SimError::InvalidArgument("model.horizon must be >= 1".into()).into());
        }
        if let Some(grid) = self.grid()? {
            grid.check_against(&self.policy)?;
        } else {
            self.policy.build()?;
        }
        Ok(())
    }

    /// Deterministic content hash of the configuration.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }

    pub fn build_process(&self) -> Result<Arc<dyn ExogenousProcess>, ConfigError> {
        Ok(match &self.process {
            ProcessConfig::Synthetic {
                noise,
                increment,
                price_floor,
            } => Arc::new(SyntheticProcess::with_options(*noise, *increment, *price_floor)?),
            ProcessConfig::Historical { path, sampling } => {
                let table = load_trajectories(path)?;
                // Steps 0..=horizon are all looked up.
                let needed = self.model.horizon + 1;
                if table.min_len() < needed {
                    return Err(SimError::InvalidArgument(format!(
                        "'{}': shortest trajectory has {} prices, horizon {} needs {needed}",
                        path.display(),
                        table.min_len(),
                        self.model.horizon
                    ))
                    .into());
                }
                Arc::new(HistoricalProcess::from_table(table, *sampling)?)
            }
        })
    }

    pub fn build_model(&self) -> Result<Model, ConfigError> {
        let process = self.build_process()?;
        Ok(Model::new(
            self.model.horizon,
            self.model.initial_price,
            process,
        )?)
    }

    pub fn build_simulator(&self) -> Simulator {
        Simulator::new(self.simulation.seed)
            .with_parallelism(self.simulation.parallel)
            .with_objective(self.simulation.objective)
    }

    /// The sweep grid, if the config declares one.
    pub fn grid(&self) -> Result<Option<ParamGrid>, ConfigError> {
        let Some(sweep) = &self.sweep else {
            return Ok(None);
        };
        let grid = match &sweep.points {
            Some(points) => ParamGrid::explicit(
                sweep.axes.iter().map(|a| a.name.clone()).collect(),
                points.clone(),
            )?,
            None => ParamGrid::new(sweep.axes.clone())?,
        };
        Ok(Some(grid))
    }

    pub fn sweep_options(&self) -> SweepOptions {
        self.sweep
            .as_ref()
            .map(|s| SweepOptions {
                ordered: s.ordered,
                on_invalid: s.on_invalid,
            })
            .unwrap_or_default()
    }
}
