//! Sell-low: exit as soon as price falls to or below `theta`.

use super::{current_price, Policy, PolicyCarry, PolicyKind};
use crate::domain::{Action, PolicyParameters, State};
use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SellLow {
    pub theta: f64,
}

impl SellLow {
    pub fn new(theta: f64) -> Result<Self, SimError> {
        if !theta.is_finite() {
            return Err(SimError::invalid_parameter("sell_low", "theta must be finite"));
        }
        Ok(Self { theta })
    }

    pub fn from_params(params: &PolicyParameters) -> Result<Self, SimError> {
        Self::new(params.require("sell_low", "theta")?)
    }

    pub fn action_at(&self, price: f64) -> Action {
        if price <= self.theta {
            Action::Sell
        } else {
            Action::Hold
        }
    }
}

impl Policy for SellLow {
    fn kind(&self) -> PolicyKind {
        PolicyKind::SellLow
    }

    fn parameters(&self) -> PolicyParameters {
        PolicyParameters::new().with("theta", self.theta)
    }

    fn decide(&self, history: &[State], _carry: &PolicyCarry) -> Action {
        current_price(history).map_or(Action::Hold, |p| self.action_at(p))
    }
}
