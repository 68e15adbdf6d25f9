//! Per-outcome binary sub-market state.

use crate::config::EngineParams;
use crate::core::errors::NumericErrorKind;
use crate::core::fixed_point::{Amount, Ratio};
use serde::{Deserialize, Serialize};

/// One of the N independent YES/NO sub-markets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binary {
    /// User-contributed collateral.
    pub v: Amount,
    /// Market-maker subsidy, `max(0, Z/N - gamma*V)`.
    pub subsidy: Amount,
    /// Effective pool, `V + subsidy`.
    pub l: Amount,
    /// Circulating YES supply (real, held by users).
    pub q_yes: Amount,
    /// Circulating NO supply (real, held by users).
    pub q_no: Amount,
    /// Renormalization addend, pricing-only.
    pub virtual_yes: Amount,
    /// Accumulated auto-fill surplus captured by the system (report-only;
    /// mirrored into `v`).
    pub seigniorage: Amount,
    pub active: bool,
}

impl Binary {
    /// `init` per spec §4.3: subsidy = Z/N, L = subsidy, q_yes = q_no = q0.
    pub fn init(params: &EngineParams) -> Result<Self, NumericErrorKind> {
        let subsidy = params.z.checked_div_int(params.n_outcomes as i128)?;
        Ok(Self {
            v: Amount::ZERO,
            subsidy,
            l: subsidy,
            q_yes: params.q0,
            q_no: params.q0,
            virtual_yes: Amount::ZERO,
            seigniorage: Amount::ZERO,
            active: true,
        })
    }

    /// `q_yes_eff := q_yes + virtual_yes`.
    pub fn q_yes_eff(&self) -> Result<Amount, NumericErrorKind> {
        self.q_yes.checked_add(self.virtual_yes)
    }

    /// `p_yes := q_yes_eff / L`.
    pub fn p_yes(&self) -> Result<Ratio, NumericErrorKind> {
        self.q_yes_eff()?.checked_div_to_ratio(self.l)
    }

    /// `p_no := q_no / L`.
    pub fn p_no(&self) -> Result<Ratio, NumericErrorKind> {
        self.q_no.checked_div_to_ratio(self.l)
    }

    /// `subsidy = max(0, Z/N - gamma*V); L = V + subsidy`.
    pub fn recompute_subsidy(&mut self, z_over_n: Amount, gamma: Ratio) -> Result<(), NumericErrorKind> {
        let drain = self.v.checked_mul_ratio(gamma)?;
        self.subsidy = z_over_n.saturating_sub_zero(drain);
        self.l = self.v.checked_add(self.subsidy)?;
        Ok(())
    }
}
