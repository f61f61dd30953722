//! Domain types: per-step state, actions, trace records, and parameter sets.

pub mod params;
pub mod state;
pub mod trace;

pub use params::PolicyParameters;
pub use state::{Action, State};
pub use trace::{EpisodeOutcome, EpisodeTrace, TraceRow};
