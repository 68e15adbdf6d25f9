//! Opt-in auto-fill: after a trigger leg's cross-impact moves a binary's
//! price, opportunistically execute opt-in resting pools against the AMM
//! and split the resulting surplus (spec §4.7).

use crate::amm;
use crate::config::constants::{system_autofill_id, AUTOFILL_SEARCH_ITERATIONS};
use crate::config::{EffectiveParams, EngineParams};
use crate::core::errors::NumericErrorKind;
use crate::core::fixed_point::{safe_div_round_half_even, safe_divide, Amount, Ratio, AMOUNT_SCALE, RATIO_SCALE};
use crate::core::ids::{Outcome, TradeId, UserId};
use crate::core::types::{FillType, Side};
use crate::event::AutoFillPayload;
use crate::event::Fill;
use crate::state::lob::{DirectionKey, PoolKey, SideKey};
use crate::state::EngineState;

/// Distributes `total` across `parts` proportionally to each part's own
/// amount (which must sum to `parts_total`), assigning any rounding
/// remainder to the last entry so the split sums exactly to `total`.
fn pro_rata_split(
    total: Amount,
    parts: &[(UserId, Amount)],
    parts_total: Amount,
) -> Result<Vec<(UserId, Amount)>, NumericErrorKind> {
    if parts.is_empty() || parts_total.is_zero() {
        return Ok(Vec::new());
    }
    let mut out = Vec::with_capacity(parts.len());
    let mut distributed = Amount::ZERO;
    for (i, (user, part)) in parts.iter().enumerate() {
        let share = if i + 1 == parts.len() {
            total.saturating_sub_zero(distributed)
        } else {
            let product = total.raw().checked_mul(part.raw()).ok_or(NumericErrorKind::Overflow)?;
            let raw = safe_div_round_half_even(product, parts_total.raw()).ok_or(NumericErrorKind::Overflow)?;
            Amount::from_raw(raw)
        };
        distributed = distributed.checked_add(share)?;
        out.push((user.clone(), share));
    }
    Ok(out)
}

/// Binary search for the largest `Δ ∈ [0, upper_bound]` such that the
/// post-trade price stays on the feasible side of `tick_price`. Feasibility
/// is monotone non-increasing in `Δ`, so a fixed iteration count suffices.
#[allow(clippy::too_many_arguments)]
fn max_feasible_delta(
    is_buy: bool,
    q_eff: Amount,
    l: Amount,
    f_i: Ratio,
    mu: Ratio,
    nu: Ratio,
    kappa: Ratio,
    tick_price: Ratio,
    upper_bound: Amount,
) -> Result<Amount, NumericErrorKind> {
    if upper_bound.raw() <= 0 {
        return Ok(Amount::ZERO);
    }
    let feasible_at = |delta_raw: i128| -> bool {
        if delta_raw <= 0 {
            return true;
        }
        let delta = Amount::from_raw(delta_raw);
        let Ok(x) = amm::solve_leg(is_buy, delta, q_eff, l, f_i, mu, nu, kappa) else {
            return false;
        };
        let Ok(p_prime) = amm::post_trade_price(is_buy, delta, q_eff, l, f_i, x) else {
            return false;
        };
        if is_buy {
            p_prime <= tick_price
        } else {
            p_prime >= tick_price
        }
    };

    let mut lo = 0i128;
    let mut hi = upper_bound.raw();
    if feasible_at(hi) {
        return Ok(Amount::from_raw(hi));
    }
    for _ in 0..AUTOFILL_SEARCH_ITERATIONS {
        if hi - lo <= 1 {
            break;
        }
        let mid = lo + (hi - lo) / 2;
        if feasible_at(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(Amount::from_raw(lo))
}

/// Runs auto-fill for every other active binary following a trigger leg of
/// size `x` on `trigger_outcome`. Returns the AUTOFILL fills (in binary
/// ascending, YES-before-NO, tick order) and their summary payloads.
#[allow(clippy::too_many_arguments)]
pub fn run_autofill(
    state: &mut EngineState,
    params: &EngineParams,
    eff: &EffectiveParams,
    trigger_outcome: Outcome,
    x: Amount,
    is_buy: bool,
    ts_ms: u64,
    next_trade_id: &mut u64,
) -> Result<(Vec<Fill>, Vec<AutoFillPayload>), NumericErrorKind> {
    let mut fills = Vec::new();
    let mut payloads = Vec::new();
    if !params.af_enabled || eff.zeta.is_zero() {
        return Ok((fills, payloads));
    }

    let d_j_abs = x.checked_mul_ratio(eff.zeta)?;
    if d_j_abs.is_zero() {
        return Ok((fills, payloads));
    }
    let z_over_n = params.z.checked_div_int(params.n_outcomes as i128)?;
    let budget_cap = d_j_abs.checked_mul_ratio(params.af_max_surplus)?;
    let per_pool_cap_base = d_j_abs.checked_mul_ratio(params.af_cap_frac)?;
    let mut pools_filled: usize = 0;

    'outer: for j in 0..state.binaries.len() {
        if j == trigger_outcome || !state.binaries[j].active {
            continue;
        }
        let mut surplus_used_j = Amount::ZERO;

        for side in [Side::Yes, Side::No] {
            let pool_direction = if is_buy { DirectionKey::Sell } else { DirectionKey::Buy };
            let side_key: SideKey = side.into();

            let mut keys: Vec<PoolKey> = state
                .lob
                .keys()
                .filter(|k| k.outcome == j && k.side == side_key && k.direction == pool_direction && k.opt_in)
                .copied()
                .collect();
            if is_buy {
                keys.sort_by(|a, b| b.tick.cmp(&a.tick));
            } else {
                keys.sort_by(|a, b| a.tick.cmp(&b.tick));
            }

            for key in &keys {
                if pools_filled >= params.af_max_pools {
                    break 'outer;
                }
                let binary = &state.binaries[j];
                let (q_eff, p_side) = match side {
                    Side::Yes => (binary.q_yes_eff()?, binary.p_yes()?),
                    Side::No => (binary.q_no, binary.p_no()?),
                };
                let l = binary.l;

                let tick_price_price = key.tick_price(params.tick_size)?;
                let tick_price: Ratio = tick_price_price.rescale::<RATIO_SCALE>()?;
                let feasible_candidate = if is_buy { tick_price > p_side } else { tick_price < p_side };
                if !feasible_candidate {
                    continue;
                }

                let pool_capacity = state
                    .lob
                    .get(key)
                    .map(|p| p.total_shares())
                    .transpose()?
                    .unwrap_or(Amount::ZERO);
                if pool_capacity.is_zero() {
                    continue;
                }
                let per_pool_cap = Amount::from_raw(safe_divide(per_pool_cap_base.raw(), tick_price.raw(), AMOUNT_SCALE)?);
                let upper_bound = if per_pool_cap < pool_capacity { per_pool_cap } else { pool_capacity };

                let delta = max_feasible_delta(
                    is_buy, q_eff, l, eff.f_i, eff.mu, eff.nu, eff.kappa, tick_price, upper_bound,
                )?;
                if delta.is_zero() {
                    continue;
                }

                let x_amm = amm::solve_leg(is_buy, delta, q_eff, l, eff.f_i, eff.mu, eff.nu, eff.kappa)?;
                let charge = delta.checked_mul_ratio(tick_price)?;
                let surplus = if is_buy {
                    charge.checked_sub(x_amm)
                } else {
                    x_amm.checked_sub(charge)
                };
                let Ok(surplus) = surplus else { continue };
                if surplus.raw() <= 0 {
                    continue;
                }

                let sigma_part = surplus.checked_mul_ratio(params.sigma)?;
                let prospective = surplus_used_j.checked_add(sigma_part)?;
                if prospective > budget_cap {
                    break;
                }
                let rebate_part = surplus.saturating_sub_zero(sigma_part);

                let consumed = {
                    let pool = state.lob.get_mut(key).expect("pool present");
                    let drained = crate::matching::drain_users_fifo(pool, delta)?;
                    let volume_delta = match key.direction {
                        DirectionKey::Sell => delta,
                        DirectionKey::Buy => Amount::from_raw(crate::core::fixed_point::mul_scaled(
                            delta.raw(),
                            tick_price_price.raw(),
                            crate::core::fixed_point::PRICE_SCALE,
                        )?),
                    };
                    pool.volume = pool.volume.saturating_sub_zero(volume_delta);
                    drained
                };
                if let Some(pool) = state.lob.get(key) {
                    if pool.is_empty() {
                        state.lob.remove(key);
                    }
                }

                let binary = &mut state.binaries[j];
                binary.v = binary.v.checked_add(sigma_part)?;
                binary.seigniorage = binary.seigniorage.checked_add(sigma_part)?;
                binary.recompute_subsidy(z_over_n, params.gamma)?;
                match side {
                    Side::Yes => {
                        binary.q_yes = if is_buy { binary.q_yes.checked_add(delta)? } else { binary.q_yes.checked_sub(delta)? };
                    }
                    Side::No => {
                        binary.q_no = if is_buy { binary.q_no.checked_add(delta)? } else { binary.q_no.checked_sub(delta)? };
                    }
                }

                let rebates = pro_rata_split(rebate_part, &consumed, delta)?;

                for (user, amount) in &consumed {
                    *next_trade_id += 1;
                    let (buyer, seller) = if is_buy {
                        (system_autofill_id(), user.clone())
                    } else {
                        (user.clone(), system_autofill_id())
                    };
                    fills.push(Fill {
                        trade_id: TradeId::new(*next_trade_id),
                        buyer,
                        seller,
                        outcome: j,
                        side,
                        price: tick_price_price,
                        size: *amount,
                        fee: Amount::ZERO,
                        fill_type: FillType::AutoFill,
                        price_yes: None,
                        price_no: None,
                        tick: Some(key.tick),
                        ts_ms,
                    });
                }

                payloads.push(AutoFillPayload {
                    outcome: j,
                    side,
                    tick: key.tick,
                    delta,
                    surplus,
                    rebates,
                });

                surplus_used_j = prospective;
                pools_filled += 1;
            }
        }
    }

    Ok((fills, payloads))
}
