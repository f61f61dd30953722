//! Append-only trace records produced by the simulator.

use serde::{Deserialize, Serialize};

use super::state::Action;

/// One visited step: `(episode_index, time_step, price, action)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceRow {
    pub episode_index: u64,
    pub time_step: usize,
    pub price: f64,
    pub action: Action,
}

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    pub episode_index: u64,
    pub sale_step: usize,
    pub sale_price: f64,
    /// Price at `t = 0`, the baseline for excess-value objectives.
    pub initial_price: f64,
    /// True when the horizon forced the sale.
    pub forced: bool,
}

/// Full record of one episode. Exactly one `Sell` row, and it is the last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeTrace {
    pub rows: Vec<TraceRow>,
    pub outcome: EpisodeOutcome,
}

impl EpisodeTrace {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Check the one-sell-at-the-end invariant.
    pub fn is_well_formed(&self) -> bool {
        let sells = self.rows.iter().filter(|r| r.action == Action::Sell).count();
        sells == 1
            && self.rows.last().map(|r| r.action) == Some(Action::Sell)
            && self
                .rows
                .iter()
                .all(|r| r.episode_index == self.outcome.episode_index)
    }
}
