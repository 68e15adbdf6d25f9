//! Closed-form AMM pricing: the buy/sell cost quadratic and the asymptotic
//! price penalty, per spec §4.4.
//!
//! A single [`solve_leg`] covers all four trade directions (buy/sell ×
//! yes/no); callers pick which quantity plays the role of `q_eff` (`q_yes_eff`
//! for YES legs, `q_no` for NO legs — NO pricing has no virtual-supply term).

use crate::config::constants::PENALTY_MAX_ITERATIONS;
use crate::core::errors::NumericErrorKind;
use crate::core::fixed_point::{mul_scaled, safe_divide, ratio_pow, Amount, Ratio, AMOUNT_SCALE, RATIO_SCALE};

/// Result of solving and penalty-correcting one AMM leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegResult {
    /// Cost paid (buy) or proceeds received (sell).
    pub amount: Amount,
    /// Post-trade price, after any asymptotic penalty correction.
    pub post_price: Ratio,
    pub penalty_applied: bool,
}

/// `a = mu/(mu+nu)`, `b = nu/(mu+nu)`.
fn split_weights(mu: Ratio, nu: Ratio) -> Result<(Ratio, Ratio), NumericErrorKind> {
    let denom = mu.checked_add(nu)?;
    let a = mu.checked_div_to_ratio(denom)?;
    let b = nu.checked_div_to_ratio(denom)?;
    Ok((a, b))
}

/// `k = Δ*a*p + κ*Δ²` (Δ² collapsed back to money scale; κ is dimensioned
/// per unit of money so the convexity term stays money-valued).
fn convexity_term(delta: Amount, a: Ratio, p: Ratio, kappa: Ratio) -> Result<i128, NumericErrorKind> {
    let delta_a = mul_scaled(delta.raw(), a.raw(), RATIO_SCALE)?;
    let delta_a_p = mul_scaled(delta_a, p.raw(), RATIO_SCALE)?;
    let delta_sq = mul_scaled(delta.raw(), delta.raw(), AMOUNT_SCALE)?;
    let kappa_delta_sq = mul_scaled(delta_sq, kappa.raw(), RATIO_SCALE)?;
    delta_a_p.checked_add(kappa_delta_sq).ok_or(NumericErrorKind::Overflow)
}

/// Solves the buy or sell quadratic for one AMM leg, given the pre-trade
/// price `p = q_eff/l`. `is_buy` selects which symmetric form (spec §4.4)
/// applies. Returns the larger positive root: cost for buy, proceeds for
/// sell.
pub fn solve_leg(
    is_buy: bool,
    delta: Amount,
    q_eff: Amount,
    l: Amount,
    f_i: Ratio,
    mu: Ratio,
    nu: Ratio,
    kappa: Ratio,
) -> Result<Amount, NumericErrorKind> {
    if delta.raw() <= 0 {
        return Err(NumericErrorKind::Overflow);
    }
    let p = q_eff.checked_div_to_ratio(l)?;
    let (a, b) = split_weights(mu, nu)?;
    let k_raw = convexity_term(delta, a, p, kappa)?;

    let (a_coef, b_coef, c_coef) = if is_buy {
        let q_plus_delta = q_eff.raw().checked_add(delta.raw()).ok_or(NumericErrorKind::Overflow)?;
        let delta_times_q = mul_scaled(delta.raw(), q_plus_delta, AMOUNT_SCALE)?;
        let m_raw = mul_scaled(delta_times_q, b.raw(), RATIO_SCALE)?;
        let fi_k = mul_scaled(f_i.raw(), k_raw, RATIO_SCALE)?;
        let b_coef = l.raw().checked_sub(fi_k).ok_or(NumericErrorKind::Overflow)?;
        let k_l = mul_scaled(k_raw, l.raw(), AMOUNT_SCALE)?;
        let c_coef = k_l.checked_add(m_raw).and_then(|v| v.checked_neg()).ok_or(NumericErrorKind::Overflow)?;
        (f_i.raw(), b_coef, c_coef)
    } else {
        let q_minus_delta = q_eff.raw().checked_sub(delta.raw()).ok_or(NumericErrorKind::Overflow)?;
        let delta_times_q = mul_scaled(delta.raw(), q_minus_delta, AMOUNT_SCALE)?;
        let m_raw = mul_scaled(delta_times_q, b.raw(), RATIO_SCALE)?;
        let fi_k = mul_scaled(f_i.raw(), k_raw, RATIO_SCALE)?;
        let b_coef = l
            .raw()
            .checked_add(fi_k)
            .and_then(|v| v.checked_neg())
            .ok_or(NumericErrorKind::Overflow)?;
        let k_l = mul_scaled(k_raw, l.raw(), AMOUNT_SCALE)?;
        let c_coef = k_l.checked_add(m_raw).ok_or(NumericErrorKind::Overflow)?;
        (f_i.raw(), b_coef, c_coef)
    };

    let x_raw = crate::core::fixed_point::solve_positive_quadratic(a_coef, b_coef, c_coef, AMOUNT_SCALE)?;
    if x_raw <= 0 {
        return Err(NumericErrorKind::NegativeDiscriminant);
    }
    Ok(Amount::from_raw(x_raw))
}

/// `p' = (q_eff ± Δ) / (L ± f_i*X)`, `+` for buy, `-` for sell.
pub fn post_trade_price(
    is_buy: bool,
    delta: Amount,
    q_eff: Amount,
    l: Amount,
    f_i: Ratio,
    x: Amount,
) -> Result<Ratio, NumericErrorKind> {
    let fi_x = mul_scaled(f_i.raw(), x.raw(), RATIO_SCALE)?;
    let (numerator, denominator) = if is_buy {
        (
            q_eff.raw().checked_add(delta.raw()).ok_or(NumericErrorKind::Overflow)?,
            l.raw().checked_add(fi_x).ok_or(NumericErrorKind::Overflow)?,
        )
    } else {
        (
            q_eff.raw().checked_sub(delta.raw()).ok_or(NumericErrorKind::Overflow)?,
            l.raw().checked_sub(fi_x).ok_or(NumericErrorKind::Overflow)?,
        )
    };
    if denominator <= 0 {
        return Err(NumericErrorKind::DivisionByZero);
    }
    safe_divide(numerator, denominator, RATIO_SCALE).map(Ratio::from_raw)
}

/// Solves one leg and applies the asymptotic penalty (spec §4.4), returning
/// the final amount and post-trade price. Never fails by rejection — the
/// penalty saturates at the bound after [`PENALTY_MAX_ITERATIONS`].
#[allow(clippy::too_many_arguments)]
pub fn trade_leg(
    is_buy: bool,
    delta: Amount,
    q_eff: Amount,
    l: Amount,
    f_i: Ratio,
    mu: Ratio,
    nu: Ratio,
    kappa: Ratio,
    p_max: Ratio,
    p_min: Ratio,
    eta: u32,
) -> Result<LegResult, NumericErrorKind> {
    let mut x = solve_leg(is_buy, delta, q_eff, l, f_i, mu, nu, kappa)?;
    let mut p_prime = post_trade_price(is_buy, delta, q_eff, l, f_i, x)?;
    let mut penalized = false;

    if is_buy {
        for _ in 0..PENALTY_MAX_ITERATIONS {
            if p_prime <= p_max {
                break;
            }
            penalized = true;
            let ratio = p_prime.checked_div_to_ratio(p_max)?;
            let factor = ratio_pow(ratio, eta)?;
            x = x.checked_mul_ratio(factor)?;
            p_prime = post_trade_price(is_buy, delta, q_eff, l, f_i, x)?;
        }
        if p_prime > p_max {
            p_prime = p_max;
        }
    } else {
        for _ in 0..PENALTY_MAX_ITERATIONS {
            if p_prime >= p_min {
                break;
            }
            penalized = true;
            if p_prime.raw() <= 0 {
                // Degenerate: proceeds collapsed to (near) zero; saturate
                // immediately rather than divide by an ~zero price.
                break;
            }
            let ratio = p_min.checked_div_to_ratio(p_prime)?;
            let factor = ratio_pow(ratio, eta)?;
            x = x.checked_mul_ratio(factor)?;
            p_prime = post_trade_price(is_buy, delta, q_eff, l, f_i, x)?;
        }
        if p_prime < p_min {
            p_prime = p_min;
        }
    }

    Ok(LegResult {
        amount: x,
        post_price: p_prime,
        penalty_applied: penalized,
    })
}
