//! Engine error type shared by the model, processes, and policies.

use thiserror::Error;

/// Errors raised by the simulation engine.
///
/// Construction-time violations are surfaced to the caller as-is; nothing in
/// the engine clamps an invalid value into range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A caller-supplied argument is unusable (zero iterations, malformed grid,
    /// empty trajectory pool, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Policy parameters violate the policy's own constraints.
    #[error("invalid parameters for {policy}: {reason}")]
    InvalidParameter { policy: String, reason: String },

    /// Historical lookup past the end of a recorded trajectory.
    #[error("step {t} out of range for episode {episode} (trajectory length {len})")]
    OutOfRange { episode: u64, t: usize, len: usize },

    /// A swept parameter has no candidate values.
    #[error("parameter '{parameter}' has no candidate values")]
    EmptyGrid { parameter: String },

    /// The historical trajectory table breaks its row contract.
    #[error("malformed trajectory table: {0}")]
    MalformedTrajectory(String),
}

impl SimError {
    pub fn invalid_parameter(policy: impl Into<String>, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            policy: policy.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that only concern one policy's parameter set.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, SimError::InvalidParameter { .. })
    }
}
