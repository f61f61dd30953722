//! Historical resampling: each episode replays one recorded trajectory.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use super::ExogenousProcess;
use crate::data::TrajectoryTable;
use crate::domain::State;
use crate::error::SimError;
use crate::rng::RngHierarchy;

const SAMPLING_STREAM: &str = "sampling";

/// How episodes are mapped onto recorded trajectories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sampling {
    /// Episode `i` replays trajectory `i mod M`.
    #[default]
    Cyclic,
    /// Independent draw per episode (hash of seed and episode index).
    WithReplacement { seed: u64 },
    /// Seeded permutation of the pool; a fresh pass starts every `M` episodes.
    WithoutReplacement { seed: u64 },
}

/// Fixed pool of recorded price trajectories.
#[derive(Debug, Clone)]
pub struct HistoricalProcess {
    trajectories: Vec<Vec<f64>>,
    sampling: Sampling,
    permutation: Vec<usize>,
}

impl HistoricalProcess {
    pub fn new(trajectories: Vec<Vec<f64>>, sampling: Sampling) -> Result<Self, SimError> {
        if trajectories.is_empty() {
            return Err(SimError::InvalidArgument(
                "historical pool has no trajectories".into(),
            ));
        }
        if let Some(i) = trajectories.iter().position(|t| t.is_empty()) {
            return Err(SimError::InvalidArgument(format!(
                "historical trajectory {i} is empty"
            )));
        }

        let mut permutation: Vec<usize> = (0..trajectories.len()).collect();
        if let Sampling::WithoutReplacement { seed } = sampling {
            permutation.shuffle(&mut StdRng::seed_from_u64(seed));
        }

        Ok(Self {
            trajectories,
            sampling,
            permutation,
        })
    }

    pub fn from_table(table: TrajectoryTable, sampling: Sampling) -> Result<Self, SimError> {
        Self::new(table.into_pool(), sampling)
    }

    pub fn pool_size(&self) -> usize {
        self.trajectories.len()
    }

    pub fn sampling(&self) -> Sampling {
        self.sampling
    }

    /// Index of the trajectory replayed by `episode_id`.
    pub fn trajectory_index(&self, episode_id: u64) -> usize {
        let m = self.trajectories.len() as u64;
        match self.sampling {
            Sampling::Cyclic => (episode_id % m) as usize,
            Sampling::WithReplacement { seed } => {
                (RngHierarchy::new(seed).sub_seed(SAMPLING_STREAM, episode_id) % m) as usize
            }
            Sampling::WithoutReplacement { .. } => self.permutation[(episode_id % m) as usize],
        }
    }

    /// Recorded price at step `t` of the episode's trajectory.
    pub fn price_at(&self, episode_id: u64, t: usize) -> Result<f64, SimError> {
        let path = &self.trajectories[self.trajectory_index(episode_id)];
        path.get(t).copied().ok_or(SimError::OutOfRange {
            episode: episode_id,
            t,
            len: path.len(),
        })
    }
}

impl ExogenousProcess for HistoricalProcess {
    fn name(&self) -> &str {
        "historical"
    }

    fn initial_price(&self, episode_id: u64) -> Result<Option<f64>, SimError> {
        self.price_at(episode_id, 0).map(Some)
    }

    fn sample(
        &self,
        episode_id: u64,
        state: &State,
        _rng: &mut dyn RngCore,
    ) -> Result<f64, SimError> {
        self.price_at(episode_id, state.t + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pool(m: usize, len: usize) -> Vec<Vec<f64>> {
        (0..m)
            .map(|i| (0..len).map(|t| (i * 100 + t) as f64).collect())
            .collect()
    }

    #[test]
    fn cyclic_assigns_episode_mod_pool() {
        let h = HistoricalProcess::new(pool(3, 4), Sampling::Cyclic).unwrap();
        assert_eq!(h.trajectory_index(0), 0);
        assert_eq!(h.trajectory_index(4), 1);
        assert_eq!(h.price_at(5, 2).unwrap(), 202.0);
        assert_eq!(h.initial_price(1).unwrap(), Some(100.0));
    }

    #[test]
    fn sample_returns_next_recorded_price() {
        let h = HistoricalProcess::new(pool(2, 4), Sampling::Cyclic).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let state = State {
            t: 1,
            ..State::initial(1, 101.0)
        };
        assert_eq!(h.sample(1, &state, &mut rng).unwrap(), 102.0);
    }

    #[test]
    fn lookup_past_end_is_out_of_range() {
        let h = HistoricalProcess::new(pool(1, 3), Sampling::Cyclic).unwrap();
        assert_eq!(
            h.price_at(0, 3),
            Err(SimError::OutOfRange {
                episode: 0,
                t: 3,
                len: 3
            })
        );
        let mut rng = StdRng::seed_from_u64(0);
        let last = State {
            t: 2,
            ..State::initial(0, 2.0)
        };
        assert!(matches!(
            h.sample(0, &last, &mut rng),
            Err(SimError::OutOfRange { .. })
        ));
    }

    #[test]
    fn without_replacement_covers_pool_each_pass() {
        let h = HistoricalProcess::new(pool(5, 2), Sampling::WithoutReplacement { seed: 11 })
            .unwrap();
        let first: HashSet<usize> = (0..5).map(|e| h.trajectory_index(e)).collect();
        assert_eq!(first.len(), 5);
        let second: Vec<usize> = (5..10).map(|e| h.trajectory_index(e)).collect();
        let again: Vec<usize> = (0..5).map(|e| h.trajectory_index(e)).collect();
        assert_eq!(second, again);
    }

    #[test]
    fn with_replacement_is_stable_per_episode() {
        let h = HistoricalProcess::new(pool(4, 2), Sampling::WithReplacement { seed: 3 }).unwrap();
        for e in 0..20 {
            assert_eq!(h.trajectory_index(e), h.trajectory_index(e));
            assert!(h.trajectory_index(e) < 4);
        }
    }

    #[test]
    fn empty_pool_or_trajectory_rejected() {
        assert!(HistoricalProcess::new(vec![], Sampling::Cyclic).is_err());
        assert!(HistoricalProcess::new(vec![vec![1.0], vec![]], Sampling::Cyclic).is_err());
    }
}
