//! Deterministic batch order application (spec §4.8).

pub mod order;

pub use order::Order;

use crate::amm;
use crate::autofill;
use crate::config::EngineParams;
use crate::core::errors::{EngineError, InputErrorReason, NumericErrorKind};
use crate::core::fixed_point::{safe_div_round_half_even, Price, Ratio};
use crate::core::ids::{OrderId, TradeId};
use crate::core::types::{Direction, FillType, OrderKind, Side};
use crate::event::{Event, EventKind, RejectReason, ZetaClampedPayload};
use crate::impact;
use crate::matching;
use crate::state::lob::PoolKey;
use crate::state::EngineState;

fn reject(order_id: OrderId, reason: InputErrorReason, ts_ms: u64) -> Event {
    Event::new(
        EventKind::OrderRejected {
            order_id,
            reason: RejectReason::Input(reason),
        },
        ts_ms,
    )
}

fn nearest_tick(price: Price, tick_size: Price) -> Result<u64, NumericErrorKind> {
    if tick_size.raw() <= 0 {
        return Err(NumericErrorKind::DivisionByZero);
    }
    let tick = safe_div_round_half_even(price.raw(), tick_size.raw()).ok_or(NumericErrorKind::Overflow)?;
    Ok(tick.max(0) as u64)
}

/// Runs the full deterministic pipeline described in spec §4.8 against an
/// owned `state`, returning the fills produced, the updated state, and the
/// event log in emission order.
pub fn apply_orders(
    mut state: EngineState,
    mut orders: Vec<Order>,
    params: &EngineParams,
    t_now: u64,
) -> Result<(Vec<crate::event::Fill>, EngineState, Vec<Event>), EngineError> {
    state.validate(params)?;

    let n_active = state.n_active();
    let eff = params
        .effective_at(t_now, n_active)
        .map_err(EngineError::NumericError)?;

    let mut events = Vec::new();
    if eff.zeta_clamped {
        let configured = params
            .zeta
            .value_at(t_now)
            .map_err(EngineError::NumericError)?;
        events.push(Event::new(
            EventKind::ZetaClamped(ZetaClampedPayload {
                outcome_count_active: n_active,
                configured,
                clamped_to: eff.zeta,
            }),
            t_now,
        ));
    }

    orders.sort_by(|a, b| (a.ts_ms, a.order_id).cmp(&(b.ts_ms, b.order_id)));

    let mut fills = Vec::new();
    let mut next_trade_id: u64 = 0;
    let mut market_orders = Vec::new();

    for order in &orders {
        if order.outcome >= state.binaries.len() {
            events.push(reject(order.order_id, InputErrorReason::UnknownOutcome, order.ts_ms));
            continue;
        }
        if !state.binaries[order.outcome].active {
            events.push(reject(order.order_id, InputErrorReason::InactiveOutcome, order.ts_ms));
            continue;
        }
        if order.size.raw() <= 0 {
            events.push(reject(order.order_id, InputErrorReason::NonPositiveSize, order.ts_ms));
            continue;
        }

        match order.kind {
            OrderKind::Market => {
                if order.limit_price.is_some() {
                    events.push(reject(
                        order.order_id,
                        InputErrorReason::MarketOrderHasLimitPrice,
                        order.ts_ms,
                    ));
                    continue;
                }
                market_orders.push(order.clone());
                events.push(Event::new(
                    EventKind::OrderAccepted { order_id: order.order_id },
                    order.ts_ms,
                ));
            }
            OrderKind::Limit => {
                let Some(limit_price) = order.limit_price else {
                    events.push(reject(order.order_id, InputErrorReason::LimitPriceOutOfRange, order.ts_ms));
                    continue;
                };
                let tick = match nearest_tick(limit_price, params.tick_size) {
                    Ok(t) => t,
                    Err(_) => {
                        events.push(reject(order.order_id, InputErrorReason::LimitPriceOutOfRange, order.ts_ms));
                        continue;
                    }
                };
                let key = PoolKey::new(order.outcome, order.side, order.direction, tick, order.af_opt_in);
                let tick_price = match key.tick_price(params.tick_size) {
                    Ok(p) => p,
                    Err(e) => return Err(EngineError::NumericError(e)),
                };
                if tick_price < params.p_min || tick_price > params.p_max {
                    events.push(reject(order.order_id, InputErrorReason::LimitPriceOutOfRange, order.ts_ms));
                    continue;
                }

                let pool = state.lob.entry(key).or_default();
                pool.add(order.user_id.clone(), order.size, tick_price, order.direction)
                    .map_err(EngineError::NumericError)?;
                events.push(Event::new(
                    EventKind::OrderAccepted { order_id: order.order_id },
                    order.ts_ms,
                ));
            }
        }
    }

    if params.cm_enabled {
        for outcome in 0..state.binaries.len() {
            if !state.binaries[outcome].active {
                continue;
            }
            let cross_fills = matching::cross_match_binary(&mut state, params, outcome, t_now, &mut next_trade_id)
                .map_err(EngineError::NumericError)?;
            for f in &cross_fills {
                events.push(Event::new(EventKind::CrossMatch(f.clone()), t_now));
            }
            fills.extend(cross_fills);
        }
        state.validate(params)?;
    }

    for order in &market_orders {
        let binary = &state.binaries[order.outcome];
        let is_buy = order.direction == Direction::Buy;
        let p_side_pre = match order.side {
            Side::Yes => binary.p_yes().map_err(EngineError::NumericError)?,
            Side::No => binary.p_no().map_err(EngineError::NumericError)?,
        };

        let mut scratch = state.clone();
        let mut scratch_trade_id = next_trade_id;
        let mut order_fills = Vec::new();
        let mut autofill_payloads = Vec::new();

        let (lob_fills, lob_filled) = matching::walk_lob(
            &mut scratch,
            params,
            order.outcome,
            order.side,
            is_buy,
            &order.user_id,
            order.size,
            order.ts_ms,
            &mut scratch_trade_id,
        )
        .map_err(EngineError::NumericError)?;
        order_fills.extend(lob_fills);

        let remaining = order.size.saturating_sub_zero(lob_filled);
        let mut amm_cost = crate::core::fixed_point::Amount::ZERO;

        if remaining.raw() > 0 {
            let binary = &scratch.binaries[order.outcome];
            let q_eff = match order.side {
                Side::Yes => binary.q_yes_eff().map_err(EngineError::NumericError)?,
                Side::No => binary.q_no,
            };
            let l = binary.l;

            let leg = amm::trade_leg(
                is_buy, remaining, q_eff, l, eff.f_i, eff.mu, eff.nu, eff.kappa, params_p_max_ratio(params)?,
                params_p_min_ratio(params)?, params.eta,
            )
            .map_err(EngineError::NumericError)?;
            amm_cost = leg.amount;

            {
                let binary = &mut scratch.binaries[order.outcome];
                match order.side {
                    Side::Yes => {
                        binary.q_yes = if is_buy {
                            binary.q_yes.checked_add(remaining).map_err(EngineError::NumericError)?
                        } else {
                            binary.q_yes.checked_sub(remaining).map_err(EngineError::NumericError)?
                        };
                    }
                    Side::No => {
                        binary.q_no = if is_buy {
                            binary.q_no.checked_add(remaining).map_err(EngineError::NumericError)?
                        } else {
                            binary.q_no.checked_sub(remaining).map_err(EngineError::NumericError)?
                        };
                    }
                }
            }

            // `apply_impact` folds both own-impact (trigger binary, weight
            // f_i) and cross-impact (every other active binary, weight ζ)
            // into `v`, then recomputes subsidy/L for every touched binary.
            impact::apply_impact(&mut scratch, params, order.outcome, leg.amount, is_buy, eff.f_i, eff.zeta)
                .map_err(EngineError::NumericError)?;

            // Fee is computed from the reported (post-trade) price, not the
            // leg's total cost `X` — §4.8e defines `fee = f · fill_size ·
            // fill_price`, and `X` generally diverges from `size * price`
            // since `price` is marginal, not average.
            let price = leg
                .post_price
                .rescale::<{ crate::core::fixed_point::PRICE_SCALE }>()
                .map_err(EngineError::NumericError)?;
            let gross = crate::core::fixed_point::Amount::from_raw(
                crate::core::fixed_point::mul_scaled(remaining.raw(), price.raw(), crate::core::fixed_point::PRICE_SCALE)
                    .map_err(EngineError::NumericError)?,
            );
            let fee = gross.checked_mul_ratio(params.f).map_err(EngineError::NumericError)?;
            scratch_trade_id += 1;
            let (buyer, seller) = if is_buy {
                (order.user_id.clone(), crate::config::constants::system_amm_id())
            } else {
                (crate::config::constants::system_amm_id(), order.user_id.clone())
            };
            order_fills.push(crate::event::Fill {
                trade_id: TradeId::new(scratch_trade_id),
                buyer,
                seller,
                outcome: order.outcome,
                side: order.side,
                price,
                size: remaining,
                fee,
                fill_type: FillType::Amm,
                price_yes: None,
                price_no: None,
                tick: None,
                ts_ms: order.ts_ms,
            });

            if params.af_enabled {
                let (af_fills, payloads) = autofill::run_autofill(
                    &mut scratch, params, &eff, order.outcome, leg.amount, is_buy, order.ts_ms, &mut scratch_trade_id,
                )
                .map_err(EngineError::NumericError)?;
                order_fills.extend(af_fills);
                autofill_payloads.extend(payloads);
            }
        }

        if let Some(max_slippage) = order.max_slippage {
            let total_filled = lob_filled.checked_add(remaining).map_err(EngineError::NumericError)?;
            if total_filled.raw() > 0 {
                let lob_cost = order_fills
                    .iter()
                    .filter(|f| f.fill_type == FillType::Lob)
                    .try_fold(crate::core::fixed_point::Amount::ZERO, |acc, f| {
                        let c = crate::core::fixed_point::mul_scaled(
                            f.size.raw(),
                            f.price.raw(),
                            crate::core::fixed_point::PRICE_SCALE,
                        )?;
                        acc.checked_add(crate::core::fixed_point::Amount::from_raw(c))
                    })
                    .map_err(EngineError::NumericError)?;
                let total_cost = lob_cost.checked_add(amm_cost).map_err(EngineError::NumericError)?;
                let avg_price_raw = crate::core::fixed_point::safe_divide(
                    total_cost.raw(),
                    total_filled.raw(),
                    crate::core::fixed_point::RATIO_SCALE,
                )
                .map_err(EngineError::NumericError)?;
                let avg_price = Ratio::from_raw(avg_price_raw);
                let diff = if avg_price > p_side_pre {
                    avg_price.checked_sub(p_side_pre)
                } else {
                    p_side_pre.checked_sub(avg_price)
                }
                .map_err(EngineError::NumericError)?;
                let realized = diff.checked_div_to_ratio(p_side_pre).map_err(EngineError::NumericError)?;
                if realized > max_slippage {
                    events.push(Event::new(
                        EventKind::OrderRejected {
                            order_id: order.order_id,
                            reason: RejectReason::Slippage { realized, limit: max_slippage },
                        },
                        order.ts_ms,
                    ));
                    continue;
                }
            }
        }

        state = scratch;
        next_trade_id = scratch_trade_id;
        for f in order_fills.iter().filter(|f| f.fill_type != FillType::AutoFill) {
            let kind = match f.fill_type {
                FillType::Cross => EventKind::CrossMatch(f.clone()),
                _ => EventKind::Fill(f.clone()),
            };
            events.push(Event::new(kind, f.ts_ms));
        }
        for payload in autofill_payloads {
            events.push(Event::new(EventKind::AutoFill(payload), order.ts_ms));
        }
        fills.extend(order_fills);
        state.validate(params)?;
    }

    Ok((fills, state, events))
}

fn params_p_max_ratio(params: &EngineParams) -> Result<Ratio, EngineError> {
    params
        .p_max
        .rescale::<{ crate::core::fixed_point::RATIO_SCALE }>()
        .map_err(EngineError::NumericError)
}

fn params_p_min_ratio(params: &EngineParams) -> Result<Ratio, EngineError> {
    params
        .p_min
        .rescale::<{ crate::core::fixed_point::RATIO_SCALE }>()
        .map_err(EngineError::NumericError)
}
