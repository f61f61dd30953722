//! Named policy parameter sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::SimError;

/// Mapping from parameter name (`theta`, `theta_low`, ...) to value.
///
/// A policy instance owns its set and never changes it; sweeping builds a
/// new set (and a new policy) per grid point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyParameters(BTreeMap<String, f64>);

impl PolicyParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Fetch a parameter the named policy cannot do without.
    pub fn require(&self, policy: &str, name: &str) -> Result<f64, SimError> {
        let value = self
            .get(name)
            .ok_or_else(|| SimError::invalid_parameter(policy, format!("missing '{name}'")))?;
        if !value.is_finite() {
            return Err(SimError::invalid_parameter(
                policy,
                format!("'{name}' must be finite, got {value}"),
            ));
        }
        Ok(value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `self` with every entry of `overrides` written on top.
    pub fn merged(&self, overrides: &PolicyParameters) -> PolicyParameters {
        let mut out = self.clone();
        for (k, v) in overrides.iter() {
            out.insert(k, v);
        }
        out
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for PolicyParameters {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Display for PolicyParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_overrides_base_values() {
        let base = PolicyParameters::new()
            .with("theta_low", 10.0)
            .with("theta_high", 30.0);
        let over = PolicyParameters::new().with("theta_high", 25.0);
        let m = base.merged(&over);
        assert_eq!(m.get("theta_low"), Some(10.0));
        assert_eq!(m.get("theta_high"), Some(25.0));
        // base untouched
        assert_eq!(base.get("theta_high"), Some(30.0));
    }

    #[test]
    fn require_rejects_missing_and_non_finite() {
        let p = PolicyParameters::new().with("theta", f64::NAN);
        assert!(matches!(
            p.require("sell_low", "theta"),
            Err(SimError::InvalidParameter { .. })
        ));
        assert!(p.require("sell_low", "theta_low").is_err());
    }

    #[test]
    fn display_is_sorted_by_name() {
        let p: PolicyParameters = [("theta_low", 10.0), ("theta_high", 30.0)]
            .into_iter()
            .collect();
        assert_eq!(p.to_string(), "{theta_high=30, theta_low=10}");
    }
}
