//! State-transition model for the hold/sell problem.
//!
//! The model owns the horizon `T`, the configured initial price, and the
//! exogenous process. All three are fixed at construction.

use rand::RngCore;
use std::sync::Arc;

use crate::domain::{Action, State};
use crate::error::SimError;
use crate::exogenous::ExogenousProcess;

/// Asset-selling transition model.
#[derive(Debug, Clone)]
pub struct Model {
    horizon: usize,
    initial_price: f64,
    process: Arc<dyn ExogenousProcess>,
}

impl Model {
    pub fn new(
        horizon: usize,
        initial_price: f64,
        process: Arc<dyn ExogenousProcess>,
    ) -> Result<Self, SimError> {
        if horizon == 0 {
            return Err(SimError::InvalidArgument("horizon must be >= 1".into()));
        }
        if !initial_price.is_finite() || initial_price < 0.0 {
            return Err(SimError::InvalidArgument(format!(
                "initial price must be finite and non-negative, got {initial_price}"
            )));
        }
        Ok(Self {
            horizon,
            initial_price,
            process,
        })
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn initial_price(&self) -> f64 {
        self.initial_price
    }

    pub fn process(&self) -> &dyn ExogenousProcess {
        self.process.as_ref()
    }

    /// Start an episode at `t = 0`, holding.
    pub fn reset(&self, episode_id: u64) -> Result<State, SimError> {
        let price = self
            .process
            .initial_price(episode_id)?
            .unwrap_or(self.initial_price);
        Ok(State::initial(episode_id, price))
    }

    /// True once the horizon forces a sale.
    pub fn is_final_step(&self, state: &State) -> bool {
        state.t >= self.horizon
    }

    /// Next exogenous observation for a live state.
    pub fn information(&self, state: &State, rng: &mut dyn RngCore) -> Result<f64, SimError> {
        self.process.sample(state.episode_id, state, rng)
    }

    /// Apply `action` and, when holding on, the next price.
    ///
    /// A terminal state is returned unchanged. Selling, or reaching `T`,
    /// ends the episode at the current price.
    pub fn step(
        &self,
        state: &State,
        action: Action,
        information: Option<f64>,
    ) -> Result<State, SimError> {
        if state.is_terminal() {
            return Ok(*state);
        }
        if action == Action::Sell || self.is_final_step(state) {
            return Ok(state.sold());
        }
        let price = information.ok_or_else(|| {
            SimError::InvalidArgument(format!(
                "episode {} step {}: holding requires the next price",
                state.episode_id, state.t
            ))
        })?;
        Ok(State {
            t: state.t + 1,
            price,
            ..*state
        })
    }
}
