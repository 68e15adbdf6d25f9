//! `apply_orders` pipeline benchmarks.
//!
//! Measures the per-batch cost of the full deterministic pipeline (§4.8):
//! validation, cross-match, the AMM/LOB commit loop, and the final
//! invariant check, across the shapes a host actually submits.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hydra_core::config::params::Interpolated;
use hydra_core::config::{EngineParams, InterpolationMode};
use hydra_core::core::fixed_point::{Amount, Price, Ratio};
use hydra_core::core::ids::OrderId;
use hydra_core::core::types::{Direction, OrderKind, Side};
use hydra_core::{apply_orders, EngineState, Order};
use rust_decimal_macros::dec;

fn bench_params(n_outcomes: usize) -> EngineParams {
    EngineParams {
        n_outcomes,
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
        res_schedule: (1..n_outcomes).map(|_| 1).collect(),
        interpolation_mode: InterpolationMode::Reset,
        zeta: Interpolated::constant(Ratio::from_decimal(dec!(0.1)).unwrap()),
        mu: Interpolated::constant(Ratio::from_decimal(dec!(1)).unwrap()),
        nu: Interpolated::constant(Ratio::from_decimal(dec!(1)).unwrap()),
        kappa: Interpolated::constant(Ratio::from_decimal(dec!(0.001)).unwrap()),
    }
}

fn market_buy(order_id: u64, outcome: usize, size: rust_decimal::Decimal) -> Order {
    Order {
        order_id: OrderId::new(order_id),
        user_id: "bench".to_string(),
        outcome,
        side: Side::Yes,
        direction: Direction::Buy,
        kind: OrderKind::Market,
        size: Amount::from_decimal(size).unwrap(),
        limit_price: None,
        af_opt_in: false,
        max_slippage: None,
        ts_ms: 1_000,
    }
}

fn bench_single_amm_buy(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_orders/single_amm_buy");
    group.significance_level(0.01).sample_size(200);

    let params = bench_params(3);
    let base_state = EngineState::init(&params).unwrap();
    let order = market_buy(1, 0, dec!(100));

    group.bench_function("n3", |b| {
        b.iter(|| {
            let state = base_state.clone();
            black_box(apply_orders(state, vec![order.clone()], &params, 0).unwrap())
        });
    });

    group.finish();
}

fn bench_cross_match_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_orders/cross_match_batch");
    group.significance_level(0.01).sample_size(200);

    let params = bench_params(3);
    let base_state = EngineState::init(&params).unwrap();
    let orders = vec![
        Order {
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
        },
        Order {
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
        },
    ];

    group.bench_function("n3", |b| {
        b.iter(|| {
            let state = base_state.clone();
            black_box(apply_orders(state, orders.clone(), &params, 0).unwrap())
        });
    });

    group.finish();
}

fn bench_varying_batch_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_orders/varying_batch_sizes");
    group.significance_level(0.01).sample_size(50);

    let params = bench_params(5);
    let base_state = EngineState::init(&params).unwrap();

    for &batch_size in &[1usize, 10, 50] {
        let orders: Vec<Order> = (0..batch_size)
            .map(|i| market_buy(i as u64 + 1, i % 5, dec!(10)))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &orders, |b, orders| {
            b.iter(|| {
                let state = base_state.clone();
                black_box(apply_orders(state, orders.clone(), &params, 0).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_varying_outcome_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_orders/varying_outcome_count");
    group.significance_level(0.01).sample_size(100);

    for &n in &[3usize, 5, 10] {
        let params = bench_params(n);
        let base_state = EngineState::init(&params).unwrap();
        let order = market_buy(1, 0, dec!(100));

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let state = base_state.clone();
                black_box(apply_orders(state, vec![order.clone()], &params, 0).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_amm_buy,
    bench_cross_match_batch,
    bench_varying_batch_sizes,
    bench_varying_outcome_count,
);
criterion_main!(benches);
