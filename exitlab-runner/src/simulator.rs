//! Monte-Carlo simulator: runs one policy against one model for N episodes.
//!
//! Every episode draws from its own generator derived from the simulator's
//! [`RngHierarchy`], so parallel and sequential runs produce identical traces
//! and the same seed always reproduces the same result.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use exitlab_core::domain::{Action, EpisodeOutcome, EpisodeTrace, PolicyParameters, TraceRow};
use exitlab_core::policy::{Policy, PolicyCarry, PolicyKind};
use exitlab_core::rng::{RngHierarchy, PRICE_STREAM};
use exitlab_core::{Model, SimError};

/// What an episode is worth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Objective {
    /// Realized sale price.
    #[default]
    SalePrice,
    /// Sale price minus the episode's starting price.
    ExcessOverInitial,
}

impl Objective {
    pub fn measure(&self, outcome: &EpisodeOutcome) -> f64 {
        match self {
            Objective::SalePrice => outcome.sale_price,
            Objective::ExcessOverInitial => outcome.sale_price - outcome.initial_price,
        }
    }
}

/// Distribution of per-episode values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub mean: f64,
    /// Sample standard deviation; 0 for a single episode.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    /// Episodes sold by the horizon rather than by the policy.
    pub forced_sales: usize,
}

impl RunStats {
    pub fn from_values(values: &[f64], forced_sales: usize) -> Self {
        let n = values.len();
        if n == 0 {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                median: 0.0,
                forced_sales,
            };
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        let std_dev = if n > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        } else {
            0.0
        };
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Self {
            mean,
            std_dev,
            min: sorted[0],
            max: sorted[n - 1],
            median: percentile_sorted(&sorted, 50.0),
            forced_sales,
        }
    }
}

/// Linear-interpolated percentile of an ascending slice.
pub fn percentile_sorted(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (pct / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Result of one simulator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub policy: PolicyKind,
    pub parameters: PolicyParameters,
    pub n_episodes: usize,
    pub objective_kind: Objective,
    /// Mean objective measure over episodes.
    pub objective: f64,
    pub stats: RunStats,
    /// Every visited step, grouped by episode in episode order.
    pub rows: Vec<TraceRow>,
    pub outcomes: Vec<EpisodeOutcome>,
}

impl RunResult {
    /// Rows of a single episode.
    pub fn episode_rows(&self, episode: u64) -> &[TraceRow] {
        let start = self.rows.partition_point(|r| r.episode_index < episode);
        let end = self.rows.partition_point(|r| r.episode_index <= episode);
        &self.rows[start..end]
    }
}

/// Monte-Carlo driver.
#[derive(Debug, Clone, Copy)]
pub struct Simulator {
    rng: RngHierarchy,
    parallel: bool,
    objective: Objective,
}

impl Simulator {
    /// Parallel simulator scoring mean sale price.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: RngHierarchy::new(seed),
            parallel: true,
            objective: Objective::SalePrice,
        }
    }

    /// Enables or disables running episodes on the rayon pool.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn seed(&self) -> u64 {
        self.rng.master_seed()
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Run `n_iterations` independent episodes of `policy` against `model`.
    pub fn run_policy(
        &self,
        model: &Model,
        policy: &dyn Policy,
        n_iterations: usize,
    ) -> Result<RunResult, SimError> {
        if n_iterations == 0 {
            return Err(SimError::InvalidArgument(
                "n_iterations must be a positive integer".into(),
            ));
        }

        let episodes: Vec<EpisodeTrace> = if self.parallel {
            (0..n_iterations as u64)
                .into_par_iter()
                .map(|i| self.run_episode(model, policy, i))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            (0..n_iterations as u64)
                .map(|i| self.run_episode(model, policy, i))
                .collect::<Result<Vec<_>, _>>()?
        };

        let total_rows = episodes.iter().map(EpisodeTrace::len).sum();
        let mut rows = Vec::with_capacity(total_rows);
        let mut outcomes = Vec::with_capacity(episodes.len());
        for episode in episodes {
            rows.extend(episode.rows);
            outcomes.push(episode.outcome);
        }

        let values: Vec<f64> = outcomes.iter().map(|o| self.objective.measure(o)).collect();
        let forced = outcomes.iter().filter(|o| o.forced).count();
        let stats = RunStats::from_values(&values, forced);

        debug!(
            policy = %policy.kind(),
            params = %policy.parameters(),
            episodes = n_iterations,
            objective = stats.mean,
            "simulation run complete"
        );

        Ok(RunResult {
            policy: policy.kind(),
            parameters: policy.parameters(),
            n_episodes: n_iterations,
            objective_kind: self.objective,
            objective: stats.mean,
            stats,
            rows,
            outcomes,
        })
    }

    /// Run a single episode from reset to sale.
    pub fn run_episode(
        &self,
        model: &Model,
        policy: &dyn Policy,
        episode: u64,
    ) -> Result<EpisodeTrace, SimError> {
        let mut rng = self.rng.rng_for(PRICE_STREAM, episode);
        let mut state = model.reset(episode)?;
        let initial_price = state.price;
        let mut history = vec![state];
        let mut carry = PolicyCarry::default();
        let mut rows = Vec::with_capacity(model.horizon() + 1);

        loop {
            let forced = model.is_final_step(&state);
            let action = if forced {
                Action::Sell
            } else {
                policy.decide(&history, &carry)
            };
            rows.push(TraceRow {
                episode_index: episode,
                time_step: state.t,
                price: state.price,
                action,
            });

            if action == Action::Sell {
                let sold = model.step(&state, Action::Sell, None)?;
                return Ok(EpisodeTrace {
                    rows,
                    outcome: EpisodeOutcome {
                        episode_index: episode,
                        sale_step: sold.t,
                        sale_price: sold.value,
                        initial_price,
                        forced,
                    },
                });
            }

            policy.observe(&mut carry, &state);
            let next_price = model.information(&state, &mut rng)?;
            state = model.step(&state, Action::Hold, Some(next_price))?;
            history.push(state);
        }
    }
}
