//! Per-step model state and the sell/hold action.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sell/hold decision taken at a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Hold,
    Sell,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Hold => "hold",
            Action::Sell => "sell",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one episode at one step.
///
/// Once `is_holding` is false the state is terminal: the model will not move
/// it again, and `value` holds the realized sale price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub episode_id: u64,
    /// Step index, 0 at reset.
    pub t: usize,
    pub price: f64,
    pub is_holding: bool,
    /// Realized value: 0 while holding, the sale price after the sale.
    pub value: f64,
}

impl State {
    /// Fresh holding state at `t = 0`.
    pub fn initial(episode_id: u64, price: f64) -> Self {
        Self {
            episode_id,
            t: 0,
            price,
            is_holding: true,
            value: 0.0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_holding
    }

    /// The same step, sold at the current price.
    pub fn sold(&self) -> Self {
        Self {
            is_holding: false,
            value: self.price,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_holding_at_zero() {
        let s = State::initial(7, 20.0);
        assert_eq!(s.t, 0);
        assert_eq!(s.episode_id, 7);
        assert!(s.is_holding);
        assert!(!s.is_terminal());
        assert_eq!(s.value, 0.0);
    }

    #[test]
    fn sold_keeps_step_and_realizes_price() {
        let s = State {
            t: 4,
            price: 17.5,
            ..State::initial(0, 20.0)
        };
        let sold = s.sold();
        assert!(sold.is_terminal());
        assert_eq!(sold.t, 4);
        assert_eq!(sold.price, 17.5);
        assert_eq!(sold.value, 17.5);
    }

    #[test]
    fn action_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Action::Sell).unwrap(), "\"sell\"");
        assert_eq!(Action::Hold.to_string(), "hold");
    }
}
