//! High-low band: exit when price leaves `(theta_low, theta_high)`.

use super::{current_price, Policy, PolicyCarry, PolicyKind};
use crate::domain::{Action, PolicyParameters, State};
use crate::error::SimError;

const NAME: &str = "high_low";

/// Sells when `price <= theta_low` or `price >= theta_high`.
///
/// Requires `theta_low < theta_high`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighLow {
    pub theta_low: f64,
    pub theta_high: f64,
}

impl HighLow {
    pub fn new(theta_low: f64, theta_high: f64) -> Result<Self, SimError> {
        if !theta_low.is_finite() || !theta_high.is_finite() {
            return Err(SimError::invalid_parameter(NAME, "thresholds must be finite"));
        }
        if theta_low >= theta_high {
            return Err(SimError::invalid_parameter(
                NAME,
                format!("theta_low ({theta_low}) must be < theta_high ({theta_high})"),
            ));
        }
        Ok(Self {
            theta_low,
            theta_high,
        })
    }

    pub fn from_params(params: &PolicyParameters) -> Result<Self, SimError> {
        Self::new(
            params.require(NAME, "theta_low")?,
            params.require(NAME, "theta_high")?,
        )
    }

    pub fn action_at(&self, price: f64) -> Action {
        if price <= self.theta_low || price >= self.theta_high {
            Action::Sell
        } else {
            Action::Hold
        }
    }
}

impl Policy for HighLow {
    fn kind(&self) -> PolicyKind {
        PolicyKind::HighLow
    }

    fn parameters(&self) -> PolicyParameters {
        PolicyParameters::new()
            .with("theta_low", self.theta_low)
            .with("theta_high", self.theta_high)
    }

    fn decide(&self, history: &[State], _carry: &PolicyCarry) -> Action {
        current_price(history).map_or(Action::Hold, |p| self.action_at(p))
    }
}
