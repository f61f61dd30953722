//! Exogenous information: where the next price comes from.
//!
//! - [`SyntheticProcess`]: random walk driven by a configurable noise model
//! - [`HistoricalProcess`]: replays one recorded trajectory per episode
//!
//! Processes never own randomness. The simulator hands each episode its own
//! generator, so a process is shared read-only across worker threads.

pub mod historical;
pub mod synthetic;

pub use historical::{HistoricalProcess, Sampling};
pub use synthetic::{Increment, NoiseModel, SyntheticProcess};

use rand::RngCore;

use crate::domain::State;
use crate::error::SimError;

/// Source of the next price observation.
pub trait ExogenousProcess: Send + Sync + std::fmt::Debug {
    /// Short identifier ("synthetic", "historical").
    fn name(&self) -> &str;

    /// Starting price for an episode, if the process dictates one.
    ///
    /// Synthetic processes return `None` and the model's configured initial
    /// price is used.
    fn initial_price(&self, _episode_id: u64) -> Result<Option<f64>, SimError> {
        Ok(None)
    }

    /// Price observed at step `state.t + 1`.
    fn sample(
        &self,
        episode_id: u64,
        state: &State,
        rng: &mut dyn RngCore,
    ) -> Result<f64, SimError>;
}
