//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Threshold policies are pure in (current price, parameters)
//! 2. HighLow rejects inverted bands
//! 3. Historical lookups past the recorded length are OutOfRange
//! 4. Terminal states never move again

use proptest::prelude::*;
use std::sync::Arc;
use exitlab_core::{
    carry_for, Action, HighLow, HistoricalProcess, Model, Policy, PolicyCarry, PolicyKind,
    PolicyParameters, Sampling, SellLow, SimError, State, SyntheticProcess, Track,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (0.0..100.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_history() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), 1..40)
}

fn states(prices: &[f64]) -> Vec<State> {
    prices
        .iter()
        .enumerate()
        .map(|(t, &price)| State {
            t,
            price,
            ..State::initial(0, prices[0])
        })
        .collect()
}

// ── 1. Purity ────────────────────────────────────────────────────────

proptest! {
    /// SellLow decides from the current price alone; earlier prices are irrelevant.
    #[test]
    fn sell_low_depends_only_on_current_price(
        theta in arb_price(),
        prefix in arb_history(),
        price in arb_price(),
    ) {
        let policy = SellLow::new(theta).unwrap();
        let mut prices = prefix;
        prices.push(price);
        let h = states(&prices);
        let a1 = policy.decide(&h, &PolicyCarry::default());
        let a2 = policy.decide(&h[h.len() - 1..], &PolicyCarry::default());
        prop_assert_eq!(a1, a2);
        prop_assert_eq!(a1, policy.action_at(price));
    }

    /// Re-feeding the same (price, parameters) to a freshly built HighLow
    /// gives the same action.
    #[test]
    fn high_low_is_deterministic(
        low in 0.0..50.0_f64,
        width in 0.01..50.0_f64,
        price in arb_price(),
    ) {
        let params = PolicyParameters::new().with("theta_low", low).with("theta_high", low + width);
        let p1 = PolicyKind::HighLow.build(&params).unwrap();
        let p2 = PolicyKind::HighLow.build(&params).unwrap();
        let h = states(&[price]);
        let carry = PolicyCarry::default();
        prop_assert_eq!(p1.decide(&h, &carry), p2.decide(&h, &carry));
        prop_assert_eq!(p1.decide(&h, &carry), p1.decide(&h, &carry));
    }

    /// Track decisions are reproducible from the history alone.
    #[test]
    fn track_is_a_function_of_history(theta in 0.0..10.0_f64, prices in arb_history()) {
        let policy = Track::trailing_high(theta).unwrap();
        let h = states(&prices);
        let a = policy.decide(&h, &carry_for(&policy, &h));
        let b = policy.decide(&h, &carry_for(&policy, &h));
        prop_assert_eq!(a, b);
    }
}

// ── 2. HighLow ordering ──────────────────────────────────────────────

proptest! {
    #[test]
    fn high_low_rejects_inverted_band(high in arb_price(), gap in 0.0..50.0_f64) {
        let result = HighLow::new(high + gap, high);
        let is_invalid_parameter = matches!(result, Err(SimError::InvalidParameter { .. }));
        prop_assert!(is_invalid_parameter);
    }
}

// ── 3. Historical range ──────────────────────────────────────────────

proptest! {
    #[test]
    fn historical_lookup_beyond_length_fails(len in 1usize..30, extra in 0usize..10) {
        let path: Vec<f64> = (0..len).map(|t| t as f64).collect();
        let process = HistoricalProcess::new(vec![path], Sampling::Cyclic).unwrap();
        prop_assert!(process.price_at(0, len - 1).is_ok());
        let is_out_of_range = matches!(
            process.price_at(0, len + extra),
            Err(SimError::OutOfRange { .. })
        );
        prop_assert!(is_out_of_range);
    }
}

// ── 4. Terminal stickiness ───────────────────────────────────────────

proptest! {
    #[test]
    fn sold_state_never_moves(price in arb_price(), next in arb_price(), horizon in 1usize..50) {
        let model = Model::new(horizon, price, Arc::new(SyntheticProcess::constant())).unwrap();
        let s0 = model.reset(0).unwrap();
        let sold = model.step(&s0, Action::Sell, Some(next)).unwrap();
        prop_assert!(sold.is_terminal());
        for action in [Action::Hold, Action::Sell] {
            prop_assert_eq!(model.step(&sold, action, Some(next)).unwrap(), sold);
        }
    }
}
