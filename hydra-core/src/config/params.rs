//! Engine tunables: static fields, time-interpolated coefficients, and
//! validation — mirrors the teacher's `Config`/`ConfigProfile` split, with
//! `validate()` written in the same "bail on first violation, in field
//! order" style as the teacher's `Config::validate()`.

use crate::core::errors::NumericErrorKind;
use crate::core::fixed_point::{safe_div_round_half_even, safe_divide, Amount, Price, Ratio, RATIO_SCALE};
use anyhow::{bail, Result as AnyResult};
use serde::{Deserialize, Serialize};

/// How time-interpolated tunables restart (or don't) across resolution rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpolationMode {
    /// Elapsed time resets to zero at the start of each round.
    Reset,
    /// Elapsed time keeps counting from session start across rounds.
    Continue,
}

/// A tunable that linearly interpolates from `start` to `end` over
/// `duration_ms`, clamped at the endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpolated {
    pub start: Ratio,
    pub end: Ratio,
    pub duration_ms: u64,
}

impl Interpolated {
    pub fn constant(value: Ratio) -> Self {
        Self {
            start: value,
            end: value,
            duration_ms: 0,
        }
    }

    /// `p(t) = p_start + clamp(t/T, 0, 1) * (p_end - p_start)`.
    pub fn value_at(&self, elapsed_ms: u64) -> Result<Ratio, NumericErrorKind> {
        if self.duration_ms == 0 || elapsed_ms >= self.duration_ms {
            return Ok(self.end);
        }
        let frac_raw = safe_divide(elapsed_ms as i128, self.duration_ms as i128, RATIO_SCALE)?;
        let frac = Ratio::from_raw(frac_raw);
        let delta = self.end.checked_sub(self.start)?;
        let step = delta.checked_mul_ratio(frac)?;
        self.start.checked_add(step)
    }
}

/// Static and time-interpolated tunables for one engine session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineParams {
    pub n_outcomes: usize,
    pub z: Amount,
    pub gamma: Ratio,
    pub q0: Amount,
    pub f: Ratio,
    pub p_max: Price,
    pub p_min: Price,
    pub eta: u32,
    pub tick_size: Price,

    pub cm_enabled: bool,
    pub af_enabled: bool,
    pub mr_enabled: bool,
    pub vc_enabled: bool,

    pub f_match: Ratio,

    pub sigma: Ratio,
    pub af_cap_frac: Ratio,
    pub af_max_pools: usize,
    pub af_max_surplus: Ratio,

    pub res_schedule: Vec<usize>,
    pub interpolation_mode: InterpolationMode,

    pub zeta: Interpolated,
    pub mu: Interpolated,
    pub nu: Interpolated,
    pub kappa: Interpolated,
}

/// Tunables resolved to a single point in time, plus the ζ-clamp outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveParams {
    pub zeta: Ratio,
    pub mu: Ratio,
    pub nu: Ratio,
    pub kappa: Ratio,
    /// `f_i = 1 - (n_active - 1) * zeta`, clamped strictly positive.
    pub f_i: Ratio,
    pub zeta_clamped: bool,
    pub n_active: usize,
}

impl EngineParams {
    /// Resolve the time-interpolated tunables at `elapsed_ms` and compute the
    /// clamped local-retention fraction `f_i` for `n_active` active binaries.
    pub fn effective_at(
        &self,
        elapsed_ms: u64,
        n_active: usize,
    ) -> Result<EffectiveParams, NumericErrorKind> {
        let zeta0 = self.zeta.value_at(elapsed_ms)?;
        let mu = self.mu.value_at(elapsed_ms)?;
        let nu = self.nu.value_at(elapsed_ms)?;
        let kappa = self.kappa.value_at(elapsed_ms)?;

        let (zeta, f_i, zeta_clamped) = if n_active <= 1 {
            (zeta0, Ratio::from_raw(RATIO_SCALE), false)
        } else {
            let mult = (n_active - 1) as i128;
            let term_raw = zeta0.raw().checked_mul(mult).ok_or(NumericErrorKind::Overflow)?;
            let f_i_raw = RATIO_SCALE
                .checked_sub(term_raw)
                .ok_or(NumericErrorKind::Overflow)?;
            if f_i_raw > 0 {
                (zeta0, Ratio::from_raw(f_i_raw), false)
            } else {
                let clamped_zeta_raw =
                    safe_div_round_half_even(RATIO_SCALE - 1, mult).ok_or(NumericErrorKind::Overflow)?;
                (Ratio::from_raw(clamped_zeta_raw.max(0)), Ratio::from_raw(1), true)
            }
        };

        Ok(EffectiveParams {
            zeta,
            mu,
            nu,
            kappa,
            f_i,
            zeta_clamped,
            n_active,
        })
    }

    /// Validates every static range in declaration order, bailing on the
    /// first violation found.
    pub fn validate(&self) -> AnyResult<()> {
        if !(3..=10).contains(&self.n_outcomes) {
            bail!("n_outcomes must be in 3..=10, got {}", self.n_outcomes);
        }
        if self.z.raw() <= 0 {
            bail!("Z must be > 0");
        }
        if self.gamma.raw() <= 0 || self.gamma.raw() > RATIO_SCALE / 1000 {
            bail!("gamma must be in (0, 0.001]");
        }
        if self.q0.raw() <= 0 {
            bail!("q0 must be > 0");
        }
        if self.f.raw() < 0 || self.f.raw() >= RATIO_SCALE * 5 / 100 {
            bail!("f must be in [0, 0.05)");
        }
        let half = Price::from_raw(crate::core::fixed_point::PRICE_SCALE / 2);
        let one = Price::from_raw(crate::core::fixed_point::PRICE_SCALE);
        if self.p_max <= half || self.p_max >= one {
            bail!("p_max must be in (0.5, 1)");
        }
        if self.p_min <= Price::ZERO || self.p_min >= half {
            bail!("p_min must be in (0, 0.5)");
        }
        if self.p_min >= self.p_max {
            bail!("p_min must be < p_max");
        }
        if self.eta < 1 {
            bail!("eta must be >= 1");
        }
        if self.tick_size.raw() <= 0 {
            bail!("tick_size must be > 0");
        }
        if self.f_match.raw() < 0 || self.f_match.raw() >= RATIO_SCALE * 2 / 100 {
            bail!("f_match must be in [0, 0.02)");
        }
        if self.sigma.raw() < 0 || self.sigma.raw() > RATIO_SCALE {
            bail!("sigma must be in [0, 1]");
        }
        if self.af_cap_frac.raw() < 0 {
            bail!("af_cap_frac must be >= 0");
        }
        if self.af_max_surplus.raw() < 0 {
            bail!("af_max_surplus must be >= 0");
        }
        let schedule_sum: usize = self.res_schedule.iter().sum();
        if schedule_sum != self.n_outcomes - 1 {
            bail!(
                "res_schedule must sum to n_outcomes - 1 ({}), got {}",
                self.n_outcomes - 1,
                schedule_sum
            );
        }
        Ok(())
    }
}
