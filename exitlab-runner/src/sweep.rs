//! Exhaustive grid search over policy parameters.
//!
//! Each grid point builds a fresh policy from the [`PolicySpec`] plus the
//! point's overrides, runs the simulator, and records the mean objective.
//! No policy instance is ever mutated, so points can run on any thread.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

use exitlab_core::domain::PolicyParameters;
use exitlab_core::policy::PolicySpec;
use exitlab_core::{Model, SimError};

use crate::simulator::Simulator;

// ─── Grid ────────────────────────────────────────────────────────────

/// One swept parameter and its candidate values, in declared order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    pub name: String,
    pub values: Vec<f64>,
}

impl GridAxis {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Parameter grid: a Cartesian product of axes, or an explicit list of points.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    axes: Vec<GridAxis>,
    explicit: Option<Vec<Vec<f64>>>,
}

impl ParamGrid {
    /// Full Cartesian product of `axes`.
    pub fn new(axes: Vec<GridAxis>) -> Result<Self, SimError> {
        validate_axis_names(axes.iter().map(|a| a.name.as_str()))?;
        for axis in &axes {
            if axis.values.is_empty() {
                return Err(SimError::EmptyGrid {
                    parameter: axis.name.clone(),
                });
            }
            validate_finite(&axis.name, &axis.values)?;
        }
        Ok(Self {
            axes,
            explicit: None,
        })
    }

    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, SimError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, values)| GridAxis::new(name, values))
                .collect(),
        )
    }

    /// Caller-chosen subset of combinations, evaluated in the given order.
    pub fn explicit(names: Vec<String>, points: Vec<Vec<f64>>) -> Result<Self, SimError> {
        validate_axis_names(names.iter().map(String::as_str))?;
        if points.is_empty() {
            return Err(SimError::InvalidArgument(
                "explicit grid has no points".into(),
            ));
        }
        let mut axes: Vec<GridAxis> = names.into_iter().map(|n| GridAxis::new(n, Vec::new())).collect();
        for (i, point) in points.iter().enumerate() {
            if point.len() != axes.len() {
                return Err(SimError::InvalidArgument(format!(
                    "grid point {i} has {} values, expected {}",
                    point.len(),
                    axes.len()
                )));
            }
            for (axis, &v) in axes.iter_mut().zip(point) {
                validate_finite(&axis.name, &[v])?;
                if !axis.values.contains(&v) {
                    axis.values.push(v);
                }
            }
        }
        Ok(Self {
            axes,
            explicit: Some(points),
        })
    }

    pub fn axes(&self) -> &[GridAxis] {
        &self.axes
    }

    pub fn axis_names(&self) -> Vec<&str> {
        self.axes.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit.is_some()
    }

    /// Check the grid's shape against the policy it will parameterize.
    ///
    /// Every axis and base parameter must be a parameter of `spec.kind`, and
    /// every required parameter must come from the base set or an axis.
    pub fn check_against(&self, spec: &PolicySpec) -> Result<(), SimError> {
        let kind = spec.kind;
        let is_known = |name: &str| {
            kind.required_parameters()
                .iter()
                .chain(kind.optional_parameters())
                .any(|p| *p == name)
        };
        for axis in &self.axes {
            if !is_known(axis.name.as_str()) {
                return Err(SimError::InvalidArgument(format!(
                    "grid axis '{}' is not a parameter of {kind}",
                    axis.name
                )));
            }
        }
        if let Some(name) = spec.params.names().find(|n| !is_known(*n)) {
            return Err(SimError::InvalidArgument(format!(
                "base parameter '{name}' is not a parameter of {kind}"
            )));
        }
        for required in kind.required_parameters() {
            if !spec.params.contains(required) && !self.axes.iter().any(|a| a.name == *required) {
                return Err(SimError::InvalidArgument(format!(
                    "{kind} needs '{required}' from the base parameters or a grid axis"
                )));
            }
        }
        Ok(())
    }

    /// Number of combinations to evaluate.
    pub fn size(&self) -> usize {
        match &self.explicit {
            Some(points) => points.len(),
            None => self.axes.iter().map(|a| a.values.len()).product(),
        }
    }

    /// Every combination, row-major over the declared axes (first axis
    /// slowest), or the explicit points in order.
    pub fn combinations(&self) -> Vec<PolicyParameters> {
        if let Some(points) = &self.explicit {
            return points.iter().map(|p| self.point(p)).collect();
        }

        let total = self.size();
        let mut out = Vec::with_capacity(total);
        let mut idx = vec![0usize; self.axes.len()];
        for _ in 0..total {
            out.push(
                self.axes
                    .iter()
                    .zip(&idx)
                    .map(|(axis, &i)| (axis.name.as_str(), axis.values[i]))
                    .collect(),
            );
            // Odometer: the last axis turns fastest.
            for pos in (0..idx.len()).rev() {
                idx[pos] += 1;
                if idx[pos] < self.axes[pos].values.len() {
                    break;
                }
                idx[pos] = 0;
            }
        }
        out
    }

    fn point(&self, values: &[f64]) -> PolicyParameters {
        self.axes
            .iter()
            .zip(values)
            .map(|(axis, &v)| (axis.name.as_str(), v))
            .collect()
    }
}

fn validate_axis_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), SimError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(SimError::InvalidArgument("grid axis with empty name".into()));
        }
        if !seen.insert(name) {
            return Err(SimError::InvalidArgument(format!(
                "grid axis '{name}' declared twice"
            )));
        }
    }
    if seen.is_empty() {
        return Err(SimError::InvalidArgument("grid has no axes".into()));
    }
    Ok(())
}

fn validate_finite(name: &str, values: &[f64]) -> Result<(), SimError> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(v) => Err(SimError::InvalidArgument(format!(
            "grid axis '{name}' has non-finite value {v}"
        ))),
        None => Ok(()),
    }
}

// ─── Options ─────────────────────────────────────────────────────────

/// What to do with a grid point whose parameters the policy rejects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvalidCombination {
    /// Record it with performance `-inf` and keep sweeping.
    #[default]
    Score,
    /// Leave it out of the result table.
    Skip,
    /// Abort the sweep with the policy's error.
    FailFast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepOptions {
    /// Evaluate sequentially in enumeration order. When false, points run on
    /// the rayon pool; the table and the winner are the same either way.
    pub ordered: bool,
    pub on_invalid: InvalidCombination,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            ordered: true,
            on_invalid: InvalidCombination::Score,
        }
    }
}

// ─── Results ─────────────────────────────────────────────────────────

/// Whether a grid point produced a real score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Valid,
    Invalid { reason: String },
}

/// One evaluated grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRun {
    pub parameters: PolicyParameters,
    /// Mean objective, or `-inf` for an invalid combination. Other
    /// non-finite values cannot be serialized.
    #[serde(with = "sentinel")]
    pub performance: f64,
    #[serde(flatten)]
    pub status: RunStatus,
}

impl GridRun {
    pub fn is_valid(&self) -> bool {
        self.status == RunStatus::Valid
    }
}

/// Full outcome of a grid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub axes: Vec<GridAxis>,
    pub best_parameters: PolicyParameters,
    #[serde(with = "sentinel")]
    pub best_performance: f64,
    pub all_runs: Vec<GridRun>,
    pub n_episodes: usize,
    pub seed: u64,
}

/// Two-axis matrix view of a sweep, rows × columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub row_axis: String,
    pub col_axis: String,
    pub row_values: Vec<f64>,
    pub col_values: Vec<f64>,
    /// `None` where the combination is absent (skipped).
    pub cells: Vec<Vec<Option<f64>>>,
}

impl GridSearchResult {
    pub fn axis_names(&self) -> Vec<&str> {
        self.axes.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn valid_runs(&self) -> impl Iterator<Item = &GridRun> {
        self.all_runs.iter().filter(|r| r.is_valid())
    }

    /// Runs sorted by performance, best first; ties keep enumeration order.
    pub fn top_n(&self, n: usize) -> Vec<&GridRun> {
        let mut sorted: Vec<&GridRun> = self.all_runs.iter().collect();
        sorted.sort_by(|a, b| b.performance.total_cmp(&a.performance));
        sorted.truncate(n);
        sorted
    }

    /// Matrix of performances indexed by two swept axes.
    ///
    /// Only defined when exactly two parameters were swept.
    pub fn pivot(&self, row_axis: &str, col_axis: &str) -> Result<PivotTable, SimError> {
        if self.axes.len() != 2 {
            return Err(SimError::InvalidArgument(format!(
                "pivot needs exactly two swept parameters, found {}",
                self.axes.len()
            )));
        }
        let find = |name: &str| {
            self.axes
                .iter()
                .find(|a| a.name == name)
                .ok_or_else(|| SimError::InvalidArgument(format!("'{name}' was not swept")))
        };
        let rows = find(row_axis)?;
        let cols = find(col_axis)?;
        if rows.name == cols.name {
            return Err(SimError::InvalidArgument(
                "pivot axes must differ".into(),
            ));
        }

        let cells = rows
            .values
            .iter()
            .map(|&rv| {
                cols.values
                    .iter()
                    .map(|&cv| {
                        self.all_runs
                            .iter()
                            .find(|r| {
                                r.parameters.get(row_axis) == Some(rv)
                                    && r.parameters.get(col_axis) == Some(cv)
                            })
                            .map(|r| r.performance)
                    })
                    .collect()
            })
            .collect();

        Ok(PivotTable {
            row_axis: rows.name.clone(),
            col_axis: cols.name.clone(),
            row_values: rows.values.clone(),
            col_values: cols.values.clone(),
            cells,
        })
    }
}

/// Stable max: the first run with the highest performance wins.
pub fn select_best(runs: &[GridRun]) -> Option<&GridRun> {
    let mut best: Option<&GridRun> = None;
    for run in runs {
        if best.map_or(true, |b| run.performance > b.performance) {
            best = Some(run);
        }
    }
    best
}

// ─── Executor ────────────────────────────────────────────────────────

/// Grid search executor.
#[derive(Debug, Clone, Copy)]
pub struct GridSearch {
    simulator: Simulator,
    options: SweepOptions,
}

impl GridSearch {
    pub fn new(simulator: Simulator) -> Self {
        Self {
            simulator,
            options: SweepOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SweepOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> SweepOptions {
        self.options
    }

    /// Evaluate every grid point against `model`.
    pub fn grid_search(
        &self,
        grid: &ParamGrid,
        spec: &PolicySpec,
        model: &Model,
        n_iterations: usize,
    ) -> Result<GridSearchResult, SimError> {
        self.grid_search_with_progress(grid, spec, model, n_iterations, |_, _, _| {})
    }

    /// Executes the search, invoking `progress(done, total, run)` after each
    /// grid point is evaluated. `run` is `None` for a skipped point, so
    /// `done` always reaches `total` on success.
    pub fn grid_search_with_progress<F>(
        &self,
        grid: &ParamGrid,
        spec: &PolicySpec,
        model: &Model,
        n_iterations: usize,
        progress: F,
    ) -> Result<GridSearchResult, SimError>
    where
        F: Fn(usize, usize, Option<&GridRun>) + Send + Sync,
    {
        if n_iterations == 0 {
            return Err(SimError::InvalidArgument(
                "n_iterations must be a positive integer".into(),
            ));
        }
        grid.check_against(spec)?;

        let combinations = grid.combinations();
        let total = combinations.len();
        let done = AtomicUsize::new(0);
        info!(
            policy = %spec.kind,
            combinations = total,
            episodes = n_iterations,
            ordered = self.options.ordered,
            "starting grid search"
        );

        let evaluate = |combo: &PolicyParameters| -> Result<Option<GridRun>, SimError> {
            let run = self.evaluate(spec, combo, model, n_iterations)?;
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            progress(finished, total, run.as_ref());
            Ok(run)
        };

        let evaluated: Vec<Option<GridRun>> = if self.options.ordered {
            combinations
                .iter()
                .map(evaluate)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            combinations
                .par_iter()
                .map(evaluate)
                .collect::<Result<Vec<_>, _>>()?
        };
        let all_runs: Vec<GridRun> = evaluated.into_iter().flatten().collect();

        let best = select_best(&all_runs).ok_or_else(|| {
            SimError::InvalidArgument("grid search produced no valid combination".into())
        })?;
        let best_parameters = best.parameters.clone();
        let best_performance = best.performance;

        info!(
            best = %best_parameters,
            performance = best_performance,
            evaluated = all_runs.len(),
            "grid search complete"
        );

        Ok(GridSearchResult {
            axes: grid.axes().to_vec(),
            best_parameters,
            best_performance,
            all_runs,
            n_episodes: n_iterations,
            seed: self.simulator.seed(),
        })
    }

    fn evaluate(
        &self,
        spec: &PolicySpec,
        combo: &PolicyParameters,
        model: &Model,
        n_iterations: usize,
    ) -> Result<Option<GridRun>, SimError> {
        let policy = match spec.build_with(combo) {
            Ok(policy) => policy,
            Err(e) if e.is_invalid_parameter() => {
                return match self.options.on_invalid {
                    InvalidCombination::Score => {
                        warn!(params = %combo, error = %e, "invalid combination scored as -inf");
                        Ok(Some(GridRun {
                            parameters: combo.clone(),
                            performance: f64::NEG_INFINITY,
                            status: RunStatus::Invalid {
                                reason: e.to_string(),
                            },
                        }))
                    }
                    InvalidCombination::Skip => {
                        warn!(params = %combo, error = %e, "invalid combination skipped");
                        Ok(None)
                    }
                    InvalidCombination::FailFast => Err(e),
                };
            }
            Err(e) => return Err(e),
        };

        let result = self.simulator.run_policy(model, policy.as_ref(), n_iterations)?;
        debug!(params = %combo, performance = result.objective, "grid point evaluated");
        Ok(Some(GridRun {
            parameters: combo.clone(),
            performance: result.objective,
            status: RunStatus::Valid,
        }))
    }
}

/// JSON has no infinities: `-inf` is written as `null` and read back.
/// `+inf` and NaN are rejected.
mod sentinel {
    use serde::ser::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            s.serialize_some(value)
        } else if *value == f64::NEG_INFINITY {
            s.serialize_none()
        } else {
            Err(S::Error::custom(format!(
                "performance {value} is not representable"
            )))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NEG_INFINITY))
    }
}
