//! The aggregate, owned market state.

use crate::config::EngineParams;
use crate::core::errors::{EngineError, InvariantViolationKind, NumericErrorKind};
use crate::core::fixed_point::{mul_scaled, Amount, Price, Ratio, PRICE_SCALE, RATIO_SCALE};
use crate::core::types::Direction;
use crate::state::binary::Binary;
use crate::state::lob::{LobPool, PoolKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The engine's exclusively-owned aggregate state. Passed by value into and
/// out of `apply_orders`/`trigger_resolution`; no aliasing, no callbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    pub binaries: Vec<Binary>,
    pub lob: BTreeMap<PoolKey, LobPool>,
    /// Snapshot of `Σ p_yes` over active binaries, taken immediately before
    /// each resolution round and consumed by renormalization.
    pub pre_sum_yes: Ratio,
}

impl EngineState {
    /// `init(params)` per spec §4.3. Requires `q0 < p_max * Z/N`.
    pub fn init(params: &EngineParams) -> Result<Self, EngineError> {
        if let Err(e) = params.validate() {
            tracing::error!(error = %e, "engine params failed validation");
            return Err(EngineError::NumericError(NumericErrorKind::Overflow));
        }

        let n = params.n_outcomes;
        let mut binaries = Vec::with_capacity(n);
        for _ in 0..n {
            binaries.push(Binary::init(params).map_err(EngineError::NumericError)?);
        }

        let state = Self {
            binaries,
            lob: BTreeMap::new(),
            pre_sum_yes: Ratio::ZERO,
        };
        state.validate(params)?;
        Ok(state)
    }

    pub fn n_active(&self) -> usize {
        self.binaries.iter().filter(|b| b.active).count()
    }

    pub fn z_over_n(&self, params: &EngineParams) -> Result<Amount, NumericErrorKind> {
        params.z.checked_div_int(params.n_outcomes as i128)
    }

    /// Recomputes `subsidy_i`/`L_i` for every binary from its current `V_i`.
    pub fn recompute_all_subsidies(&mut self, params: &EngineParams) -> Result<(), NumericErrorKind> {
        let z_over_n = self.z_over_n(params)?;
        for binary in &mut self.binaries {
            binary.recompute_subsidy(z_over_n, params.gamma)?;
        }
        Ok(())
    }

    /// Full invariant validation per spec §4.3, called at `apply_orders`
    /// entry/exit and at every mutation boundary inside the pipeline.
    pub fn validate(&self, params: &EngineParams) -> Result<(), EngineError> {
        let mut subsidy_sum = Amount::ZERO;
        for (i, binary) in self.binaries.iter().enumerate() {
            if !binary.active {
                continue;
            }
            if binary.l.raw() <= 0 {
                return Err(EngineError::InvariantViolation(
                    InvariantViolationKind::NonPositivePool { outcome: i },
                ));
            }
            let q_yes_eff = binary
                .q_yes_eff()
                .map_err(EngineError::NumericError)?;
            let sum_q = q_yes_eff
                .checked_add(binary.q_no)
                .map_err(EngineError::NumericError)?;
            let two_l = binary.l.checked_mul_int(2).map_err(EngineError::NumericError)?;
            if sum_q.raw() >= two_l.raw() {
                return Err(EngineError::InvariantViolation(
                    InvariantViolationKind::SolvencyBreached { outcome: i },
                ));
            }
            let p_yes = binary.p_yes().map_err(EngineError::NumericError)?;
            let p_no = binary.p_no().map_err(EngineError::NumericError)?;
            let p_max_ratio = Ratio::from_raw(params.p_max.raw() * (RATIO_SCALE / PRICE_SCALE));
            if p_yes.raw() <= 0 || p_yes >= p_max_ratio || p_no.raw() <= 0 || p_no >= p_max_ratio {
                return Err(EngineError::InvariantViolation(
                    InvariantViolationKind::PriceOutOfBounds { outcome: i },
                ));
            }
            if params.vc_enabled && binary.virtual_yes.raw() < 0 {
                return Err(EngineError::InvariantViolation(
                    InvariantViolationKind::NegativeVirtualYes { outcome: i },
                ));
            }
            subsidy_sum = subsidy_sum
                .checked_add(binary.subsidy)
                .map_err(EngineError::NumericError)?;
        }
        if subsidy_sum.raw() > params.z.raw() {
            return Err(EngineError::InvariantViolation(
                InvariantViolationKind::SubsidyBudgetExceeded,
            ));
        }

        for (key, pool) in &self.lob {
            if pool.volume.raw() < 0 {
                return Err(EngineError::InvariantViolation(
                    InvariantViolationKind::PoolVolumeMismatch { outcome: key.outcome },
                ));
            }
            let expected = match key.direction {
                crate::state::lob::DirectionKey::Sell => {
                    pool.total_shares().map_err(EngineError::NumericError)?
                }
                crate::state::lob::DirectionKey::Buy => {
                    let tick_price = key
                        .tick_price(params.tick_size)
                        .map_err(EngineError::NumericError)?;
                    let mut total = Amount::ZERO;
                    for share in pool.shares.values() {
                        let contrib = Amount::from_raw(
                            mul_scaled(share.raw(), tick_price.raw(), PRICE_SCALE)
                                .map_err(EngineError::NumericError)?,
                        );
                        total = total.checked_add(contrib).map_err(EngineError::NumericError)?;
                    }
                    total
                }
            };
            if expected != pool.volume {
                return Err(EngineError::InvariantViolation(
                    InvariantViolationKind::PoolVolumeMismatch { outcome: key.outcome },
                ));
            }
        }

        Ok(())
    }
}
