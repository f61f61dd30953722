//! ExitLab Core: state, exogenous price processes, transition model, policies.
//!
//! This crate contains the engine of the hold/sell simulator:
//! - Domain types (state, actions, trace rows, parameter sets)
//! - Synthetic and historical exogenous price processes
//! - The transition model with a fixed horizon and forced terminal sale
//! - Sell/hold policy family behind the [`policy::Policy`] trait
//! - Deterministic per-episode RNG derivation

pub mod data;
pub mod domain;
pub mod error;
pub mod exogenous;
pub mod model;
pub mod policy;
pub mod rng;

pub use data::{Trajectory, TrajectoryRow, TrajectoryTable};
pub use domain::{Action, EpisodeOutcome, EpisodeTrace, PolicyParameters, State, TraceRow};
pub use error::SimError;
pub use exogenous::{
    ExogenousProcess, HistoricalProcess, Increment, NoiseModel, Sampling, SyntheticProcess,
};
pub use model::Model;
pub use policy::{
    carry_for, HighLow, Policy, PolicyCarry, PolicyKind, PolicySpec, SellLow, Track,
    TrackReference,
};
pub use rng::RngHierarchy;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything shared across simulation workers is
    /// Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<State>();
        require_sync::<State>();
        require_send::<TraceRow>();
        require_sync::<TraceRow>();
        require_send::<EpisodeTrace>();
        require_sync::<EpisodeTrace>();
        require_send::<PolicyParameters>();
        require_sync::<PolicyParameters>();
        require_send::<Model>();
        require_sync::<Model>();
        require_send::<SyntheticProcess>();
        require_sync::<SyntheticProcess>();
        require_send::<HistoricalProcess>();
        require_sync::<HistoricalProcess>();
        require_send::<Box<dyn Policy>>();
        require_sync::<Box<dyn Policy>>();
        require_send::<PolicySpec>();
        require_sync::<PolicySpec>();
        require_send::<RngHierarchy>();
        require_sync::<RngHierarchy>();
    }

    /// Architecture contract: policies see only the history and their own
    /// carry, never the model or the random source.
    #[test]
    fn policy_trait_has_no_model_or_rng_parameter() {
        fn _check_trait_object_builds(
            policy: &dyn Policy,
            history: &[State],
            carry: &PolicyCarry,
        ) -> Action {
            policy.decide(history, carry)
        }
    }
}
