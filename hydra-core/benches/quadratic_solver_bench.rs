//! Closed-form AMM quadratic solver benchmarks.
//!
//! Isolates the hot numeric core from the rest of the pipeline: the
//! quadratic root solve, the asymptotic penalty loop, and the underlying
//! integer square root it depends on.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hydra_core::amm::{solve_leg, trade_leg};
use hydra_core::core::fixed_point::{isqrt_i128, solve_positive_quadratic, Amount, Ratio, AMOUNT_SCALE};
use rust_decimal_macros::dec;

fn ratio(s: rust_decimal::Decimal) -> Ratio {
    Ratio::from_decimal(s).unwrap()
}
fn amount(s: rust_decimal::Decimal) -> Amount {
    Amount::from_decimal(s).unwrap()
}

fn bench_solve_leg(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadratic/solve_leg");
    group.significance_level(0.01).sample_size(5000);

    let q_eff = amount(dec!(1666.67));
    let l = amount(dec!(3333.33));
    let f_i = ratio(dec!(0.8));
    let mu = ratio(dec!(1));
    let nu = ratio(dec!(1));
    let kappa = ratio(dec!(0.001));

    group.bench_function("buy", |b| {
        let delta = amount(dec!(100));
        b.iter(|| black_box(solve_leg(true, black_box(delta), q_eff, l, f_i, mu, nu, kappa).unwrap()));
    });

    group.bench_function("sell", |b| {
        let delta = amount(dec!(100));
        b.iter(|| black_box(solve_leg(false, black_box(delta), q_eff, l, f_i, mu, nu, kappa).unwrap()));
    });

    group.finish();
}

fn bench_trade_leg_with_penalty(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadratic/trade_leg");
    group.significance_level(0.01).sample_size(2000);

    let q_eff = amount(dec!(1666.67));
    let l = amount(dec!(3333.33));
    let f_i = ratio(dec!(0.8));
    let mu = ratio(dec!(1));
    let nu = ratio(dec!(1));
    let kappa = ratio(dec!(0.001));
    let p_max = ratio(dec!(0.99));
    let p_min = ratio(dec!(0.01));

    group.bench_function("no_penalty", |b| {
        let delta = amount(dec!(100));
        b.iter(|| black_box(trade_leg(true, black_box(delta), q_eff, l, f_i, mu, nu, kappa, p_max, p_min, 2).unwrap()));
    });

    group.bench_function("penalty_saturates", |b| {
        let delta = amount(dec!(100000));
        b.iter(|| black_box(trade_leg(true, black_box(delta), q_eff, l, f_i, mu, nu, kappa, p_max, p_min, 2).unwrap()));
    });

    group.finish();
}

fn bench_solve_positive_quadratic(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadratic/solve_positive_quadratic");
    group.significance_level(0.01).sample_size(5000);

    // Coefficients in the shape `solve_leg` feeds it for a typical buy leg.
    let a_coef: i128 = 800_000;
    let b_coef: i128 = 3_333_330_000_000;
    let c_coef: i128 = -166_667_000_000_000_000;

    group.bench_function("typical_buy_coefficients", |b| {
        b.iter(|| black_box(solve_positive_quadratic(black_box(a_coef), b_coef, c_coef, AMOUNT_SCALE).unwrap()));
    });

    group.finish();
}

fn bench_isqrt(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadratic/isqrt_i128");
    group.significance_level(0.01).sample_size(5000);

    for &magnitude in &[1_000_000i128, 1_000_000_000_000, 1_000_000_000_000_000_000] {
        group.bench_with_input(BenchmarkId::from_parameter(magnitude), &magnitude, |b, &n| {
            b.iter(|| black_box(isqrt_i128(black_box(n))));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_solve_leg,
    bench_trade_leg_with_penalty,
    bench_solve_positive_quadratic,
    bench_isqrt,
);
criterion_main!(benches);
