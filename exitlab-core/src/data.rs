//! Historical trajectory table: the external input contract.
//!
//! Rows arrive as `(episode_index, time_step, price)`, one contiguous block
//! per episode, `time_step` starting at 0 and increasing by one with no gaps.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::SimError;

/// One row of the input table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRow {
    pub episode_index: u64,
    pub time_step: usize,
    pub price: f64,
}

/// A single recorded episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub episode_index: u64,
    pub prices: Vec<f64>,
}

/// Validated set of trajectories, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrajectoryTable {
    trajectories: Vec<Trajectory>,
}

impl TrajectoryTable {
    pub fn from_rows<I>(rows: I) -> Result<Self, SimError>
    where
        I: IntoIterator<Item = TrajectoryRow>,
    {
        let mut trajectories: Vec<Trajectory> = Vec::new();
        let mut seen: HashSet<u64> = HashSet::new();

        for (line, row) in rows.into_iter().enumerate() {
            if !row.price.is_finite() {
                return Err(SimError::MalformedTrajectory(format!(
                    "row {line}: non-finite price {}",
                    row.price
                )));
            }

            let continues = trajectories
                .last()
                .is_some_and(|t| t.episode_index == row.episode_index);

            if continues {
                if let Some(current) = trajectories.last_mut() {
                    let expected = current.prices.len();
                    if row.time_step != expected {
                        return Err(SimError::MalformedTrajectory(format!(
                            "row {line}: episode {} expected time_step {expected}, got {}",
                            row.episode_index, row.time_step
                        )));
                    }
                    current.prices.push(row.price);
                }
            } else {
                if !seen.insert(row.episode_index) {
                    return Err(SimError::MalformedTrajectory(format!(
                        "row {line}: episode {} is not contiguous",
                        row.episode_index
                    )));
                }
                if row.time_step != 0 {
                    return Err(SimError::MalformedTrajectory(format!(
                        "row {line}: episode {} starts at time_step {}",
                        row.episode_index, row.time_step
                    )));
                }
                trajectories.push(Trajectory {
                    episode_index: row.episode_index,
                    prices: vec![row.price],
                });
            }
        }

        if trajectories.is_empty() {
            return Err(SimError::MalformedTrajectory("table has no rows".into()));
        }
        Ok(Self { trajectories })
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn trajectories(&self) -> &[Trajectory] {
        &self.trajectories
    }

    /// Shortest recorded trajectory length; bounds the usable horizon.
    pub fn min_len(&self) -> usize {
        self.trajectories
            .iter()
            .map(|t| t.prices.len())
            .min()
            .unwrap_or(0)
    }

    /// Drop episode labels, keeping only the price paths.
    pub fn into_pool(self) -> Vec<Vec<f64>> {
        self.trajectories.into_iter().map(|t| t.prices).collect()
    }
}
