//! Conservation of collateral across a trade batch (spec §8 P5).
//!
//! `Σ V_i + Σ escrowed LOB volume` should only move by the collateral a taker
//! actually pays in (AMM) or escrows (LIMIT), net of the maker fee on a
//! cross-match; no collateral is created or destroyed elsewhere. Subsidy is
//! excluded from the ledger: it is the market's virtual backstop, not cash a
//! user paid in, and it drifts with V through `gamma` independently of this
//! invariant.

use hydra_core::config::params::Interpolated;
use hydra_core::config::{EngineParams, InterpolationMode};
use hydra_core::core::fixed_point::{Amount, Price, Ratio};
use hydra_core::core::ids::OrderId;
use hydra_core::core::types::{Direction, OrderKind, Side};
use hydra_core::{apply_orders, EngineState, Order};
use rust_decimal_macros::dec;

fn test_params() -> EngineParams {
    EngineParams {
        n_outcomes: 3,
        z: Amount::from_decimal(dec!(10000)).unwrap(),
        gamma: Ratio::from_decimal(dec!(0.0001)).unwrap(),
        q0: Amount::from_decimal(dec!(1666.67)).unwrap(),
        f: Ratio::from_decimal(dec!(0.01)).unwrap(),
        p_max: Price::from_decimal(dec!(0.99)).unwrap(),
        p_min: Price::from_decimal(dec!(0.01)).unwrap(),
        eta: 2,
        tick_size: Price::from_decimal(dec!(0.01)).unwrap(),
        cm_enabled: true,
        af_enabled: true,
        mr_enabled: true,
        vc_enabled: true,
        f_match: Ratio::from_decimal(dec!(0.005)).unwrap(),
        sigma: Ratio::from_decimal(dec!(0.5)).unwrap(),
        af_cap_frac: Ratio::from_decimal(dec!(0.5)).unwrap(),
        af_max_pools: 10,
        af_max_surplus: Ratio::from_decimal(dec!(0.5)).unwrap(),
        res_schedule: vec![1, 1],
        interpolation_mode: InterpolationMode::Reset,
        zeta: Interpolated::constant(Ratio::from_decimal(dec!(0.1)).unwrap()),
        mu: Interpolated::constant(Ratio::from_decimal(dec!(1)).unwrap()),
        nu: Interpolated::constant(Ratio::from_decimal(dec!(1)).unwrap()),
        kappa: Interpolated::constant(Ratio::from_decimal(dec!(0.001)).unwrap()),
    }
}

fn pool_ledger(state: &EngineState) -> Amount {
    let mut total = Amount::ZERO;
    for binary in &state.binaries {
        total = total.checked_add(binary.v).unwrap();
    }
    for pool in state.lob.values() {
        total = total.checked_add(pool.volume).unwrap();
    }
    total
}

fn total_fees(fills: &[hydra_core::event::Fill]) -> Amount {
    fills.iter().fold(Amount::ZERO, |acc, f| acc.checked_add(f.fee).unwrap())
}

/// A single AMM-only BUY: own-impact (`f_i`) plus cross-impact (`zeta` on
/// every other active binary) are designed to sum to exactly the AMM leg's
/// cost `X`, since `f_i = 1 - (n_active-1)*zeta` — so the total V across all
/// binaries grows by `X` regardless of how it's split. We don't have direct
/// access to `X` here, so we only assert the ledger grew and that everything
/// still validates; the exact-split identity is covered by `impact`'s own
/// unit tests.
#[test]
fn amm_only_buy_conserves_collateral_up_to_taker_payment() {
    let params = test_params();
    let state = EngineState::init(&params).unwrap();
    let before = pool_ledger(&state);

    let order = Order {
        order_id: OrderId::new(1),
        user_id: "alice".to_string(),
        outcome: 0,
        side: Side::Yes,
        direction: Direction::Buy,
        kind: OrderKind::Market,
        size: Amount::from_decimal(dec!(100)).unwrap(),
        limit_price: None,
        af_opt_in: false,
        max_slippage: None,
        ts_ms: 1_000,
    };

    let (fills, new_state, _) = apply_orders(state, vec![order], &params, 0).unwrap();
    let after = pool_ledger(&new_state);
    let amm_fill = fills.iter().find(|f| f.fill_type == hydra_core::core::FillType::Amm).unwrap();

    assert!(after.raw() > before.raw());
    assert!(amm_fill.fee.is_positive());
    // no LOB collateral was touched by a pure AMM fill.
    assert!(new_state.lob.is_empty());
    new_state.validate(&params).unwrap();
}

/// Placing a LIMIT order escrows exactly the expected collateral/tokens into
/// the pool ledger and nothing else changes.
#[test]
fn placing_a_limit_buy_escrows_expected_collateral() {
    let params = test_params();
    let state = EngineState::init(&params).unwrap();
    let before = pool_ledger(&state);

    let order = Order {
        order_id: OrderId::new(1),
        user_id: "alice".to_string(),
        outcome: 0,
        side: Side::Yes,
        direction: Direction::Buy,
        kind: OrderKind::Limit,
        size: Amount::from_decimal(dec!(100)).unwrap(),
        limit_price: Some(Price::from_decimal(dec!(0.55)).unwrap()),
        af_opt_in: false,
        max_slippage: None,
        ts_ms: 1_000,
    };

    let (fills, new_state, _) = apply_orders(state, vec![order], &params, 0).unwrap();
    assert!(fills.is_empty());
    let after = pool_ledger(&new_state);
    let escrow = Amount::from_decimal(dec!(55)).unwrap();
    assert_eq!(after, before.checked_add(escrow).unwrap());
}

/// Cross-matching two resting LIMIT orders only moves collateral by the
/// match fee; the sum of fills' fees equals exactly that delta.
#[test]
fn cross_match_batch_conserves_collateral_up_to_fee() {
    let params = test_params();
    let state = EngineState::init(&params).unwrap();

    let yes_buy = Order {
        order_id: OrderId::new(1),
        user_id: "alice".to_string(),
        outcome: 0,
        side: Side::Yes,
        direction: Direction::Buy,
        kind: OrderKind::Limit,
        size: Amount::from_decimal(dec!(100)).unwrap(),
        limit_price: Some(Price::from_decimal(dec!(0.55)).unwrap()),
        af_opt_in: false,
        max_slippage: None,
        ts_ms: 1_000,
    };
    let no_sell = Order {
        order_id: OrderId::new(2),
        user_id: "bob".to_string(),
        outcome: 0,
        side: Side::No,
        direction: Direction::Sell,
        kind: OrderKind::Limit,
        size: Amount::from_decimal(dec!(80)).unwrap(),
        limit_price: Some(Price::from_decimal(dec!(0.50)).unwrap()),
        af_opt_in: false,
        max_slippage: None,
        ts_ms: 1_001,
    };

    let (fills, new_state, _) = apply_orders(state, vec![yes_buy, no_sell], &params, 0).unwrap();
    let after = pool_ledger(&new_state);

    let fee = total_fees(&fills);
    // alice's 20 remaining YES-BUY shares stay escrowed (0.55*20 = 11); the
    // cross-matched 80 leaves V_0 net of the match fee.
    let remaining_escrow = Amount::from_decimal(dec!(11)).unwrap();
    let matched_gross = Amount::from_decimal(dec!(84)).unwrap(); // (0.55+0.50)*80
    let matched_net = matched_gross.checked_sub(fee).unwrap();

    let expected = remaining_escrow.checked_add(matched_net).unwrap();
    assert_eq!(after, expected);
}
