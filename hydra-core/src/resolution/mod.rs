//! Intermediate elimination and final settlement (spec §4.9).

use crate::config::EngineParams;
use crate::core::errors::{EngineError, NumericErrorKind, ResolutionErrorKind};
use crate::core::fixed_point::{Amount, Ratio};
use crate::core::ids::{Outcome, UserId};
use crate::core::types::Side;
use crate::event::{Event, EventKind, EliminationPayload, ResolutionFinalPayload, ResolutionRoundPayload};
use crate::state::lob::DirectionKey;
use crate::state::EngineState;
use std::collections::BTreeMap;

/// Which resolution call this is: a final settlement naming the winner, or
/// an intermediate round eliminating a batch of outcomes (only meaningful
/// when `mr_enabled`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionMode {
    Final(Outcome),
    Intermediate(Vec<Outcome>),
}

/// Host collaborator: returns token holdings per `(outcome, side)` at the
/// instant of the call. Called once per outcome/side this function needs,
/// never cached across calls (spec §6).
pub trait PositionsLookup {
    fn positions(&mut self, outcome: Outcome, side: Side) -> BTreeMap<UserId, Amount>;
}

impl<F> PositionsLookup for F
where
    F: FnMut(Outcome, Side) -> BTreeMap<UserId, Amount>,
{
    fn positions(&mut self, outcome: Outcome, side: Side) -> BTreeMap<UserId, Amount> {
        (self)(outcome, side)
    }
}

fn credit(payouts: &mut BTreeMap<UserId, Amount>, user: UserId, amount: Amount) -> Result<(), NumericErrorKind> {
    if amount.is_zero() {
        return Ok(());
    }
    let entry = payouts.entry(user).or_insert(Amount::ZERO);
    *entry = entry.checked_add(amount)?;
    Ok(())
}

fn sum_tokens(positions: &BTreeMap<UserId, Amount>) -> Result<Amount, NumericErrorKind> {
    let mut total = Amount::ZERO;
    for amount in positions.values() {
        total = total.checked_add(*amount)?;
    }
    Ok(total)
}

/// Cancels every resting LIMIT order across all outcomes (spec §9, resolved
/// open question: final resolution cancels open orders before computing
/// payouts). BUY-pool cancellation refunds escrowed collateral into the
/// returned map; SELL-pool cancellation just unlocks tokens the host already
/// tracks and carries no collateral payout here.
fn cancel_all_limit_orders(state: &mut EngineState) -> Result<BTreeMap<UserId, Amount>, NumericErrorKind> {
    let mut payouts = BTreeMap::new();
    let keys: Vec<_> = state.lob.keys().copied().collect();
    for key in keys {
        let Some(pool) = state.lob.get_mut(&key) else { continue };
        let users: Vec<UserId> = pool.shares.keys().cloned().collect();
        for user in users {
            if let Some((_share, refund)) = pool.cancel(&user)? {
                if key.direction == DirectionKey::Buy {
                    credit(&mut payouts, user, refund)?;
                }
            }
        }
    }
    state.lob.clear();
    Ok(payouts)
}

fn sum_pre_sum_yes(state: &EngineState) -> Result<Ratio, NumericErrorKind> {
    let mut total = Ratio::ZERO;
    for binary in &state.binaries {
        if !binary.active {
            continue;
        }
        total = total.checked_add(binary.p_yes()?)?;
    }
    Ok(total)
}

/// Pays out every remaining active binary's NO side and the winner's YES
/// side, then marks all binaries inactive. A single no-op-on-state call when
/// only the winner remains active (spec P11).
fn run_final(
    state: &mut EngineState,
    winner: Outcome,
    lookup: &mut dyn PositionsLookup,
) -> Result<BTreeMap<UserId, Amount>, EngineError> {
    if winner >= state.binaries.len() {
        return Err(EngineError::ResolutionError(ResolutionErrorKind::AlreadyInactive { outcome: winner }));
    }

    let mut payouts = cancel_all_limit_orders(state).map_err(EngineError::NumericError)?;

    for (j, binary) in state.binaries.iter().enumerate() {
        if j == winner {
            let yes_holders = lookup.positions(j, Side::Yes);
            for (user, tokens) in yes_holders {
                credit(&mut payouts, user, tokens).map_err(EngineError::NumericError)?;
            }
        } else if binary.active {
            let no_holders = lookup.positions(j, Side::No);
            for (user, tokens) in no_holders {
                credit(&mut payouts, user, tokens).map_err(EngineError::NumericError)?;
            }
        }
    }

    for binary in &mut state.binaries {
        binary.active = false;
    }

    Ok(payouts)
}

/// Eliminates each outcome in `targets` (ascending), pays its NO side,
/// redistributes the freed liquidity, then renormalizes YES prices across
/// the survivors so their sum tracks the pre-round snapshot (spec §4.9).
fn run_intermediate(
    state: &mut EngineState,
    params: &EngineParams,
    mut targets: Vec<Outcome>,
    lookup: &mut dyn PositionsLookup,
) -> Result<(BTreeMap<UserId, Amount>, Vec<Event>), EngineError> {
    if !params.mr_enabled {
        return Err(EngineError::ResolutionError(ResolutionErrorKind::IntermediateResolutionDisabled));
    }
    targets.sort_unstable();

    let pre_sum_yes = sum_pre_sum_yes(state).map_err(EngineError::NumericError)?;

    let mut payouts = BTreeMap::new();
    let mut events = Vec::new();
    let mut total_freed = Amount::ZERO;

    for &k in &targets {
        if k >= state.binaries.len() || !state.binaries[k].active {
            return Err(EngineError::ResolutionError(ResolutionErrorKind::AlreadyInactive { outcome: k }));
        }

        let no_holders = lookup.positions(k, Side::No);
        let paid_no = sum_tokens(&no_holders).map_err(EngineError::NumericError)?;

        let binary = &mut state.binaries[k];
        if paid_no > binary.l {
            return Err(EngineError::ResolutionError(ResolutionErrorKind::PayoutExceedsPool { outcome: k }));
        }
        let freed = binary.l.checked_sub(paid_no).map_err(EngineError::NumericError)?;
        binary.v = binary.v.saturating_sub_zero(paid_no);
        binary.active = false;
        total_freed = total_freed.checked_add(freed).map_err(EngineError::NumericError)?;

        for (user, tokens) in no_holders {
            credit(&mut payouts, user, tokens).map_err(EngineError::NumericError)?;
        }

        events.push(Event::new(
            EventKind::Elimination(EliminationPayload { outcome: k, paid_no, freed }),
            0,
        ));
    }

    let n_active_after = state.n_active();
    if n_active_after > 0 {
        let share = total_freed
            .checked_div_int(n_active_after as i128)
            .map_err(EngineError::NumericError)?;
        for binary in state.binaries.iter_mut().filter(|b| b.active) {
            binary.v = binary.v.checked_add(share).map_err(EngineError::NumericError)?;
        }
        state.recompute_all_subsidies(params).map_err(EngineError::NumericError)?;
    }

    let capped = renormalize(state, pre_sum_yes, params.vc_enabled).map_err(EngineError::NumericError)?;

    state.validate(params)?;

    let post_sum = sum_pre_sum_yes(state).map_err(EngineError::NumericError)?;
    events.push(Event::new(
        EventKind::ResolutionRound(ResolutionRoundPayload {
            pre_sum_yes,
            post_sum_yes: post_sum,
            capped_outcomes: capped,
        }),
        0,
    ));

    Ok((payouts, events))
}

/// `virtual_yes_j := max(floor, p_yes*_j * L_j - q_yes_j)` for every active
/// `j`, where `p_yes*_j = p_yes_j * pre_sum_yes / post_sum` rescales the
/// post-elimination prices back toward the pre-round sum. `floor` is `0`
/// when `vc_enabled`, unbounded otherwise. Returns the outcomes whose target
/// was clamped by the floor.
fn renormalize(state: &mut EngineState, pre_sum_yes: Ratio, vc_enabled: bool) -> Result<Vec<Outcome>, NumericErrorKind> {
    let mut post_sum = Ratio::ZERO;
    let mut current: Vec<(Outcome, Ratio)> = Vec::new();
    for (j, binary) in state.binaries.iter().enumerate() {
        if !binary.active {
            continue;
        }
        let p = binary.p_yes()?;
        current.push((j, p));
        post_sum = post_sum.checked_add(p)?;
    }

    let mut capped = Vec::new();
    if post_sum.is_zero() {
        return Ok(capped);
    }

    for (j, p_yes_j) in current {
        let numer = p_yes_j.checked_mul_ratio(pre_sum_yes)?;
        let target = numer.checked_div_to_ratio(post_sum)?;

        let binary = &mut state.binaries[j];
        let target_q_yes_eff = binary.l.checked_mul_ratio(target)?;
        let raw_virtual = target_q_yes_eff.checked_sub(binary.q_yes)?;

        if vc_enabled && raw_virtual.is_negative() {
            capped.push(j);
            binary.virtual_yes = Amount::ZERO;
        } else {
            binary.virtual_yes = raw_virtual;
        }
    }
    Ok(capped)
}

/// Entry point for both resolution flows (spec §4.9). `positions_lookup` is
/// the host collaborator fetching current token holdings per
/// `(outcome, side)`; it is never called by `apply_orders`.
pub fn trigger_resolution(
    mut state: EngineState,
    params: &EngineParams,
    mode: ResolutionMode,
    mut positions_lookup: impl PositionsLookup,
) -> Result<(BTreeMap<UserId, Amount>, EngineState, Vec<Event>), EngineError> {
    state.validate(params)?;

    match mode {
        ResolutionMode::Final(winner) => {
            let payouts = run_final(&mut state, winner, &mut positions_lookup)?;
            let events = vec![Event::new(EventKind::ResolutionFinal(ResolutionFinalPayload { winner }), 0)];
            Ok((payouts, state, events))
        }
        ResolutionMode::Intermediate(targets) => {
            if targets.is_empty() {
                return Err(EngineError::ResolutionError(ResolutionErrorKind::ScheduleMismatch));
            }
            let (payouts, events) = run_intermediate(&mut state, params, targets, &mut positions_lookup)?;
            Ok((payouts, state, events))
        }
    }
}
