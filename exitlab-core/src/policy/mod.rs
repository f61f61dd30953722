//! Sell/hold policies.
//!
//! A policy maps the visited state history to an [`Action`]. Policies are
//! immutable: parameters are fixed at construction, so the same
//! `(history, parameters)` always yields the same action and one instance can
//! be shared by every episode of a run.
//!
//! ## Concrete implementations
//!
//! - [`SellLow`]: sell once price falls to `theta`
//! - [`HighLow`]: sell outside the `[theta_low, theta_high]` band
//! - [`Track`]: sell when price strays more than `theta` from a running reference

pub mod high_low;
pub mod sell_low;
pub mod track;

pub use high_low::HighLow;
pub use sell_low::SellLow;
pub use track::{Track, TrackReference};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::{Action, PolicyParameters, State};
use crate::error::SimError;

/// O(1) per-episode memory a policy may carry across steps.
///
/// Reset at every episode start and only ever derived from the visited
/// prices, so it adds no hidden state beyond the history itself.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PolicyCarry {
    pub reference: Option<f64>,
}

/// Decision rule over the visited state history.
pub trait Policy: Send + Sync + fmt::Debug {
    fn kind(&self) -> PolicyKind;

    /// The parameter set this instance was built from.
    fn parameters(&self) -> PolicyParameters;

    /// Decide at the last state of `history`. An empty history holds.
    fn decide(&self, history: &[State], carry: &PolicyCarry) -> Action;

    /// Fold the state just decided on into the carry. Default: nothing to keep.
    fn observe(&self, _carry: &mut PolicyCarry, _state: &State) {}
}

/// Rebuild the carry a policy would hold when deciding at the last element
/// of `history`.
pub fn carry_for(policy: &dyn Policy, history: &[State]) -> PolicyCarry {
    let mut carry = PolicyCarry::default();
    if let Some((_, earlier)) = history.split_last() {
        for s in earlier {
            policy.observe(&mut carry, s);
        }
    }
    carry
}

/// Policy families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    SellLow,
    HighLow,
    Track,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 3] = [PolicyKind::SellLow, PolicyKind::HighLow, PolicyKind::Track];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::SellLow => "sell_low",
            PolicyKind::HighLow => "high_low",
            PolicyKind::Track => "track",
        }
    }

    pub fn required_parameters(&self) -> &'static [&'static str] {
        match self {
            PolicyKind::SellLow => &["theta"],
            PolicyKind::HighLow => &["theta_low", "theta_high"],
            PolicyKind::Track => &["theta"],
        }
    }

    pub fn optional_parameters(&self) -> &'static [&'static str] {
        match self {
            PolicyKind::Track => &["alpha"],
            _ => &[],
        }
    }

    /// Construct a fresh policy from a parameter set.
    ///
    /// Unknown parameter names are rejected.
    pub fn build(&self, params: &PolicyParameters) -> Result<Box<dyn Policy>, SimError> {
        for name in params.names() {
            let known = self
                .required_parameters()
                .iter()
                .chain(self.optional_parameters())
                .any(|p| *p == name);
            if !known {
                return Err(SimError::invalid_parameter(
                    self.as_str(),
                    format!("unknown parameter '{name}'"),
                ));
            }
        }
        Ok(match self {
            PolicyKind::SellLow => Box::new(SellLow::from_params(params)?),
            PolicyKind::HighLow => Box::new(HighLow::from_params(params)?),
            PolicyKind::Track => Box::new(Track::from_params(params)?),
        })
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PolicyKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| SimError::InvalidArgument(format!("unknown policy kind '{s}'")))
    }
}

/// Policy family plus the parameters that stay fixed while sweeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub kind: PolicyKind,
    #[serde(default)]
    pub params: PolicyParameters,
}

impl PolicySpec {
    pub fn new(kind: PolicyKind, params: PolicyParameters) -> Self {
        Self { kind, params }
    }

    pub fn build(&self) -> Result<Box<dyn Policy>, SimError> {
        self.kind.build(&self.params)
    }

    /// Fresh instance with `overrides` written over the base parameters.
    pub fn build_with(&self, overrides: &PolicyParameters) -> Result<Box<dyn Policy>, SimError> {
        self.kind.build(&self.params.merged(overrides))
    }
}

/// Current price at the end of the history, if any.
pub(crate) fn current_price(history: &[State]) -> Option<f64> {
    history.last().map(|s| s.price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in PolicyKind::ALL {
            assert_eq!(kind.as_str().parse::<PolicyKind>().unwrap(), kind);
        }
        assert!("sell_high".parse::<PolicyKind>().is_err());
    }

    #[test]
    fn build_rejects_unknown_and_missing_parameters() {
        let typo = PolicyParameters::new().with("theta_lo", 10.0).with("theta_high", 30.0);
        assert!(matches!(
            PolicyKind::HighLow.build(&typo),
            Err(SimError::InvalidParameter { .. })
        ));
        let missing = PolicyParameters::new().with("theta_low", 10.0);
        assert!(PolicyKind::HighLow.build(&missing).is_err());
    }

    #[test]
    fn spec_builds_fresh_instances_with_overrides() {
        let spec = PolicySpec::new(
            PolicyKind::HighLow,
            PolicyParameters::new().with("theta_low", 10.0).with("theta_high", 30.0),
        );
        let p = spec
            .build_with(&PolicyParameters::new().with("theta_low", 15.0))
            .unwrap();
        assert_eq!(p.parameters().get("theta_low"), Some(15.0));
        assert_eq!(spec.build().unwrap().parameters().get("theta_low"), Some(10.0));
    }

    #[test]
    fn spec_deserializes_snake_case_kind() {
        let spec: PolicySpec =
            serde_json::from_str(r#"{"kind":"sell_low","params":{"theta":15.0}}"#).unwrap();
        assert_eq!(spec.kind, PolicyKind::SellLow);
        assert_eq!(spec.params.get("theta"), Some(15.0));
    }
}
