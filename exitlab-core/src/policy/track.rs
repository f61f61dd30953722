//! Track: sell when price deviates from a running reference by more than `theta`.
//!
//! Two references are supported:
//! - trailing high: highest price seen so far, deviation = high - price
//! - smoothed: exponential smoothing with weight `alpha`, deviation = |price - r|
//!
//! The reference lives in [`PolicyCarry`] and is folded in after each decision,
//! so the current price is always compared to what came before it.

use super::{current_price, Policy, PolicyCarry, PolicyKind};
use crate::domain::{Action, PolicyParameters, State};
use crate::error::SimError;

const NAME: &str = "track";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackReference {
    TrailingHigh,
    Smoothed { alpha: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub theta: f64,
    pub reference: TrackReference,
}

impl Track {
    pub fn new(theta: f64, reference: TrackReference) -> Result<Self, SimError> {
        if !theta.is_finite() || theta < 0.0 {
            return Err(SimError::invalid_parameter(
                NAME,
                format!("theta must be finite and >= 0, got {theta}"),
            ));
        }
        if let TrackReference::Smoothed { alpha } = reference {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(SimError::invalid_parameter(
                    NAME,
                    format!("alpha must be in (0, 1], got {alpha}"),
                ));
            }
        }
        Ok(Self { theta, reference })
    }

    pub fn trailing_high(theta: f64) -> Result<Self, SimError> {
        Self::new(theta, TrackReference::TrailingHigh)
    }

    /// `theta` is required; an `alpha` switches to the smoothed reference.
    pub fn from_params(params: &PolicyParameters) -> Result<Self, SimError> {
        let theta = params.require(NAME, "theta")?;
        let reference = if params.contains("alpha") {
            TrackReference::Smoothed {
                alpha: params.require(NAME, "alpha")?,
            }
        } else {
            TrackReference::TrailingHigh
        };
        Self::new(theta, reference)
    }

    fn deviation(&self, reference: f64, price: f64) -> f64 {
        match self.reference {
            TrackReference::TrailingHigh => reference - price,
            TrackReference::Smoothed { .. } => (price - reference).abs(),
        }
    }
}

impl Policy for Track {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Track
    }

    fn parameters(&self) -> PolicyParameters {
        let params = PolicyParameters::new().with("theta", self.theta);
        match self.reference {
            TrackReference::TrailingHigh => params,
            TrackReference::Smoothed { alpha } => params.with("alpha", alpha),
        }
    }

    fn decide(&self, history: &[State], carry: &PolicyCarry) -> Action {
        match (current_price(history), carry.reference) {
            (Some(price), Some(reference)) if self.deviation(reference, price) > self.theta => {
                Action::Sell
            }
            _ => Action::Hold,
        }
    }

    fn observe(&self, carry: &mut PolicyCarry, state: &State) {
        let price = state.price;
        carry.reference = Some(match (self.reference, carry.reference) {
            (_, None) => price,
            (TrackReference::TrailingHigh, Some(high)) => high.max(price),
            (TrackReference::Smoothed { alpha }, Some(r)) => (1.0 - alpha) * r + alpha * price,
        });
    }
}
