//! Limit order book matching: batched YES/NO cross-match within a binary,
//! and market-order-vs-resting-LOB walks (spec §4.6).

use crate::config::EngineParams;
use crate::core::errors::NumericErrorKind;
use crate::core::fixed_point::{
    mul_scaled, safe_div_round_half_even, Amount, Price, Ratio, AMOUNT_SCALE, PRICE_SCALE, RATIO_SCALE,
};
use crate::core::ids::{Outcome, TradeId, UserId};
use crate::core::types::{FillType, Side};
use crate::event::Fill;
use crate::state::lob::{DirectionKey, LobPool, PoolKey, SideKey};
use crate::state::EngineState;

/// `T*tick_size + T_no*tick_size >= 1 + f_match*(T+T_no)*tick_size/2`,
/// evaluated exactly in raw `Ratio`-scale integers.
fn cross_match_condition(
    t_yes: u64,
    t_no: u64,
    tick_size: Price,
    f_match: Ratio,
) -> Result<bool, NumericErrorKind> {
    let tick_size_ratio_raw = tick_size.raw() * (RATIO_SCALE / PRICE_SCALE);
    let sum_ticks = (t_yes as i128)
        .checked_add(t_no as i128)
        .ok_or(NumericErrorKind::Overflow)?;
    let lhs_raw = tick_size_ratio_raw
        .checked_mul(sum_ticks)
        .ok_or(NumericErrorKind::Overflow)?;
    let fee_scaled = mul_scaled(f_match.raw(), lhs_raw, RATIO_SCALE)?;
    let fee_term = safe_div_round_half_even(fee_scaled, 2).ok_or(NumericErrorKind::Overflow)?;
    let rhs_raw = RATIO_SCALE
        .checked_add(fee_term)
        .ok_or(NumericErrorKind::Overflow)?;
    Ok(lhs_raw >= rhs_raw)
}

/// Drains up to `amount` tokens from `pool.shares`, visiting users in
/// lexicographic order (BTreeMap iteration order), returning the per-user
/// amounts actually drained. Does not touch `pool.volume` — callers adjust
/// it themselves, since the unit (collateral vs tokens) is direction-specific.
pub(crate) fn drain_users_fifo(
    pool: &mut LobPool,
    amount: Amount,
) -> Result<Vec<(UserId, Amount)>, NumericErrorKind> {
    let mut remaining = amount;
    let mut drained = Vec::new();
    let mut exhausted_users = Vec::new();
    for (user, share) in pool.shares.iter_mut() {
        if remaining.is_zero() {
            break;
        }
        let take = if *share < remaining { *share } else { remaining };
        if take.is_zero() {
            continue;
        }
        *share = share.checked_sub(take)?;
        remaining = remaining.checked_sub(take)?;
        drained.push((user.clone(), take));
        if share.is_zero() {
            exhausted_users.push(user.clone());
        }
    }
    for user in exhausted_users {
        pool.shares.remove(&user);
    }
    Ok(drained)
}

/// Merges two allocation lists with equal total sum into pairwise
/// `(a_user, b_user, amount)` tuples, in encounter order.
fn merge_allocations(a: &[(UserId, Amount)], b: &[(UserId, Amount)]) -> Vec<(UserId, UserId, Amount)> {
    let mut result = Vec::new();
    let mut ai = 0usize;
    let mut bi = 0usize;
    let mut a_rem = a.first().map(|(_, amt)| *amt).unwrap_or(Amount::ZERO);
    let mut b_rem = b.first().map(|(_, amt)| *amt).unwrap_or(Amount::ZERO);
    while ai < a.len() && bi < b.len() {
        let take = if a_rem < b_rem { a_rem } else { b_rem };
        if take.raw() > 0 {
            result.push((a[ai].0.clone(), b[bi].0.clone(), take));
        }
        a_rem = a_rem.saturating_sub_zero(take);
        b_rem = b_rem.saturating_sub_zero(take);
        if a_rem.is_zero() {
            ai += 1;
            if ai < a.len() {
                a_rem = a[ai].1;
            }
        }
        if b_rem.is_zero() {
            bi += 1;
            if bi < b.len() {
                b_rem = b[bi].1;
            }
        }
    }
    result
}

fn pool_tokens(state: &EngineState, key: &PoolKey) -> Amount {
    state
        .lob
        .get(key)
        .and_then(|p| p.total_shares().ok())
        .unwrap_or(Amount::ZERO)
}

fn remove_if_empty(state: &mut EngineState, key: &PoolKey) {
    if let Some(pool) = state.lob.get(key) {
        if pool.is_empty() {
            state.lob.remove(key);
        }
    }
}

/// Runs batched YES/NO cross-matching for one binary until no further pair
/// of ticks satisfies the cross-match condition. Returns the CROSS fills
/// produced, in match order, and mutates `V_i`/`q_yes_i`/`q_no_i` directly.
pub fn cross_match_binary(
    state: &mut EngineState,
    params: &EngineParams,
    outcome: Outcome,
    ts_ms: u64,
    next_trade_id: &mut u64,
) -> Result<Vec<Fill>, NumericErrorKind> {
    let mut fills = Vec::new();

    let mut yes_keys: Vec<PoolKey> = state
        .lob
        .keys()
        .filter(|k| k.outcome == outcome && k.side == SideKey::Yes && k.direction == DirectionKey::Buy)
        .copied()
        .collect();
    yes_keys.sort_by(|a, b| b.tick.cmp(&a.tick).then(a.opt_in.cmp(&b.opt_in)));

    let mut no_keys: Vec<PoolKey> = state
        .lob
        .keys()
        .filter(|k| k.outcome == outcome && k.side == SideKey::No && k.direction == DirectionKey::Sell)
        .copied()
        .collect();
    no_keys.sort_by(|a, b| a.tick.cmp(&b.tick).then(a.opt_in.cmp(&b.opt_in)));

    for yes_key in &yes_keys {
        loop {
            let yes_remaining = pool_tokens(state, yes_key);
            if yes_remaining.is_zero() {
                break;
            }
            let mut matched = false;
            for no_key in &no_keys {
                let no_remaining = pool_tokens(state, no_key);
                if no_remaining.is_zero() {
                    continue;
                }
                if !cross_match_condition(yes_key.tick, no_key.tick, params.tick_size, params.f_match)? {
                    continue;
                }

                let fill_size = if yes_remaining < no_remaining { yes_remaining } else { no_remaining };
                if fill_size.is_zero() {
                    continue;
                }

                let yes_price = yes_key.tick_price(params.tick_size)?;
                let no_price = no_key.tick_price(params.tick_size)?;

                let consumed_yes = {
                    let pool = state.lob.get_mut(yes_key).expect("yes pool present");
                    let drained = drain_users_fifo(pool, fill_size)?;
                    let volume_delta = Amount::from_raw(mul_scaled(fill_size.raw(), yes_price.raw(), PRICE_SCALE)?);
                    pool.volume = pool.volume.saturating_sub_zero(volume_delta);
                    drained
                };
                let consumed_no = {
                    let pool = state.lob.get_mut(no_key).expect("no pool present");
                    let drained = drain_users_fifo(pool, fill_size)?;
                    pool.volume = pool.volume.saturating_sub_zero(fill_size);
                    drained
                };
                remove_if_empty(state, yes_key);
                remove_if_empty(state, no_key);

                let sum_ticks_price = yes_price.checked_add(no_price)?;
                let fee_total = Amount::from_raw(
                    safe_div_round_half_even(
                        mul_scaled(
                            mul_scaled(params.f_match.raw(), sum_ticks_price.raw(), PRICE_SCALE)?,
                            fill_size.raw(),
                            AMOUNT_SCALE,
                        )?,
                        2,
                    )
                    .ok_or(NumericErrorKind::Overflow)?,
                );
                let gross = Amount::from_raw(mul_scaled(sum_ticks_price.raw(), fill_size.raw(), PRICE_SCALE)?);
                let v_delta = gross.checked_sub(fee_total)?;

                let binary = &mut state.binaries[outcome];
                binary.v = binary.v.checked_add(v_delta)?;
                binary.q_yes = binary.q_yes.checked_add(fill_size)?;
                binary.q_no = binary.q_no.checked_add(fill_size)?;

                for (buyer, seller, amount) in merge_allocations(&consumed_yes, &consumed_no) {
                    *next_trade_id += 1;
                    // Fee is linear in size, so computing it per lot from the
                    // same formula as `fee_total` above keeps the per-fill
                    // fees summing to exactly the amount debited from `v`.
                    let lot_fee = Amount::from_raw(
                        safe_div_round_half_even(
                            mul_scaled(
                                mul_scaled(params.f_match.raw(), sum_ticks_price.raw(), PRICE_SCALE)?,
                                amount.raw(),
                                AMOUNT_SCALE,
                            )?,
                            2,
                        )
                        .ok_or(NumericErrorKind::Overflow)?,
                    );
                    fills.push(Fill {
                        trade_id: TradeId::new(*next_trade_id),
                        buyer,
                        seller,
                        outcome,
                        side: Side::Yes,
                        price: yes_price,
                        size: amount,
                        fee: lot_fee,
                        fill_type: FillType::Cross,
                        price_yes: Some(yes_price),
                        price_no: Some(no_price),
                        tick: Some(yes_key.tick),
                        ts_ms,
                    });
                }
                matched = true;
                break;
            }
            if !matched {
                break;
            }
        }
    }

    Ok(fills)
}

/// Walks the resting opposing LOB for a MARKET order on `outcome`/`side`,
/// filling at each tick's price (best price first) up to `remaining`.
/// Returns `(fills, filled_amount)`. Updates `q_side` at commit time for
/// every fill (resolves spec's O3): a taker BUY mints into `q_side`, a
/// taker SELL burns from it.
pub fn walk_lob(
    state: &mut EngineState,
    params: &EngineParams,
    outcome: Outcome,
    side: Side,
    is_buy: bool,
    taker: &str,
    remaining: Amount,
    ts_ms: u64,
    next_trade_id: &mut u64,
) -> Result<(Vec<Fill>, Amount), NumericErrorKind> {
    let side_key: SideKey = side.into();
    let opposing_direction = if is_buy { DirectionKey::Sell } else { DirectionKey::Buy };

    let mut keys: Vec<PoolKey> = state
        .lob
        .keys()
        .filter(|k| k.outcome == outcome && k.side == side_key && k.direction == opposing_direction)
        .copied()
        .collect();
    if is_buy {
        keys.sort_by(|a, b| a.tick.cmp(&b.tick).then(a.opt_in.cmp(&b.opt_in)));
    } else {
        keys.sort_by(|a, b| b.tick.cmp(&a.tick).then(a.opt_in.cmp(&b.opt_in)));
    }

    let mut fills = Vec::new();
    let initial = remaining;
    let mut remaining = remaining;

    for key in &keys {
        if remaining.is_zero() {
            break;
        }
        let pool_remaining = pool_tokens(state, key);
        if pool_remaining.is_zero() {
            continue;
        }
        let fill_size = if remaining < pool_remaining { remaining } else { pool_remaining };
        let tick_price = key.tick_price(params.tick_size)?;

        let consumed = {
            let pool = state.lob.get_mut(key).expect("pool present");
            let drained = drain_users_fifo(pool, fill_size)?;
            let volume_delta = match key.direction {
                DirectionKey::Buy => {
                    Amount::from_raw(mul_scaled(fill_size.raw(), tick_price.raw(), PRICE_SCALE)?)
                }
                DirectionKey::Sell => fill_size,
            };
            pool.volume = pool.volume.saturating_sub_zero(volume_delta);
            drained
        };
        remove_if_empty(state, key);

        let binary = &mut state.binaries[outcome];
        match side {
            Side::Yes => {
                binary.q_yes = if is_buy {
                    binary.q_yes.checked_add(fill_size)?
                } else {
                    binary.q_yes.checked_sub(fill_size)?
                };
            }
            Side::No => {
                binary.q_no = if is_buy {
                    binary.q_no.checked_add(fill_size)?
                } else {
                    binary.q_no.checked_sub(fill_size)?
                };
            }
        }

        for (maker, amount) in consumed {
            *next_trade_id += 1;
            let (buyer, seller) = if is_buy {
                (taker.to_string(), maker)
            } else {
                (maker, taker.to_string())
            };
            // fee = f * fill_size * fill_price (spec §4.6/§4.8e), recorded on
            // the fill rather than folded into the taker's q/V leg above.
            let gross = Amount::from_raw(mul_scaled(amount.raw(), tick_price.raw(), PRICE_SCALE)?);
            let fee = gross.checked_mul_ratio(params.f)?;
            fills.push(Fill {
                trade_id: TradeId::new(*next_trade_id),
                buyer,
                seller,
                outcome,
                side,
                price: tick_price,
                size: amount,
                fee,
                fill_type: FillType::Lob,
                price_yes: None,
                price_no: None,
                tick: Some(key.tick),
                ts_ms,
            });
        }
        remaining = remaining.checked_sub(fill_size)?;
    }

    let filled = initial.checked_sub(remaining)?;
    Ok((fills, filled))
}
