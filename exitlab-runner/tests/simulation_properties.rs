//! Property tests for simulator and grid search invariants.
//!
//! 1. One sale per episode: exactly one `sell`, always the last row
//! 2. Forced sales happen exactly at the horizon
//! 3. Grid exhaustiveness: one run per combination

use proptest::prelude::*;
use std::sync::Arc;

use exitlab_core::exogenous::{NoiseModel, SyntheticProcess};
use exitlab_core::{Action, HighLow, Model, PolicyKind, PolicyParameters, PolicySpec};
use exitlab_runner::{GridSearch, ParamGrid, Simulator};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_band() -> impl Strategy<Value = (f64, f64)> {
    (5.0..20.0_f64, 0.5..15.0_f64).prop_map(|(low, width)| (low, low + width))
}

fn arb_axis() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::btree_set(1u32..40, 1..4)
        .prop_map(|s| s.into_iter().map(f64::from).collect())
}

fn model(horizon: usize) -> Model {
    let process = SyntheticProcess::new(NoiseModel::Normal {
        mean: 0.0,
        std_dev: 1.5,
    })
    .unwrap();
    Model::new(horizon, 20.0, Arc::new(process)).unwrap()
}

// ── 1 & 2. Sale invariants ───────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn one_sale_per_episode(
        (low, high) in arb_band(),
        horizon in 1usize..40,
        seed in any::<u64>(),
    ) {
        let policy = HighLow::new(low, high).unwrap();
        let result = Simulator::new(seed)
            .with_parallelism(false)
            .run_policy(&model(horizon), &policy, 20)
            .unwrap();

        for outcome in &result.outcomes {
            let rows = result.episode_rows(outcome.episode_index);
            let sells = rows.iter().filter(|r| r.action == Action::Sell).count();
            prop_assert_eq!(sells, 1);
            let last = rows.last().unwrap();
            prop_assert_eq!(last.action, Action::Sell);
            prop_assert_eq!(last.time_step, outcome.sale_step);
            prop_assert_eq!(last.price, outcome.sale_price);
            prop_assert_eq!(outcome.forced, outcome.sale_step == horizon);
            if !outcome.forced {
                prop_assert!(last.price <= low || last.price >= high);
            }
            prop_assert!(outcome.sale_step <= horizon);
        }
    }
}

// ── 3. Exhaustiveness ────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn grid_is_exhaustive(lows in arb_axis(), widths in arb_axis()) {
        let highs: Vec<f64> = widths.iter().map(|w| w + 40.0).collect();
        let grid = ParamGrid::from_pairs([
            ("theta_low", lows.clone()),
            ("theta_high", highs.clone()),
        ])
        .unwrap();
        let spec = PolicySpec::new(PolicyKind::HighLow, PolicyParameters::new());
        let result = GridSearch::new(Simulator::new(1))
            .grid_search(&grid, &spec, &model(5), 3)
            .unwrap();

        prop_assert_eq!(result.all_runs.len(), lows.len() * highs.len());
        prop_assert!(result.all_runs.iter().all(|r| r.is_valid()));
    }
}
