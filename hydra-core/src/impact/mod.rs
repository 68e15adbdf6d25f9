//! Own- and cross-pool collateral diversion after an AMM leg commits
//! (spec §4.5).

use crate::config::EngineParams;
use crate::core::errors::NumericErrorKind;
use crate::core::fixed_point::{Amount, Ratio};
use crate::state::EngineState;

/// Applies own-impact to `trigger_outcome` and cross-impact (scaled by ζ) to
/// every other active binary, then recomputes every touched binary's
/// subsidy/L. Binaries are visited in ascending index order for determinism.
pub fn apply_impact(
    state: &mut EngineState,
    params: &EngineParams,
    trigger_outcome: usize,
    x: Amount,
    is_buy: bool,
    f_i: Ratio,
    zeta: Ratio,
) -> Result<(), NumericErrorKind> {
    let sign_is_positive = is_buy;
    let z_over_n = state.z_over_n(params)?;

    let own_delta = x.checked_mul_ratio(f_i)?;
    let cross_delta = x.checked_mul_ratio(zeta)?;

    for (j, binary) in state.binaries.iter_mut().enumerate() {
        if !binary.active {
            continue;
        }
        let delta = if j == trigger_outcome { own_delta } else { cross_delta };
        binary.v = if sign_is_positive {
            binary.v.checked_add(delta)?
        } else {
            binary.v.checked_sub(delta)?
        };
        binary.recompute_subsidy(z_over_n, params.gamma)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::params::Interpolated;
    use crate::config::InterpolationMode;
    use crate::core::fixed_point::Price;
    use crate::state::EngineState;
    use rust_decimal_macros::dec;

    fn test_params() -> EngineParams {
        EngineParams {
            n_outcomes: 3,
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
            res_schedule: vec![1, 1],
            interpolation_mode: InterpolationMode::Reset,
            zeta: Interpolated::constant(Ratio::from_decimal(dec!(0.1)).unwrap()),
            mu: Interpolated::constant(Ratio::from_decimal(dec!(1)).unwrap()),
            nu: Interpolated::constant(Ratio::from_decimal(dec!(1)).unwrap()),
            kappa: Interpolated::constant(Ratio::from_decimal(dec!(0.001)).unwrap()),
        }
    }

    #[test]
    fn buy_raises_trigger_v_and_raises_cross_v() {
        let params = test_params();
        let mut state = EngineState::init(&params).unwrap();
        let x = Amount::from_decimal(dec!(100)).unwrap();
        let f_i = Ratio::from_decimal(dec!(0.8)).unwrap();
        let zeta = Ratio::from_decimal(dec!(0.1)).unwrap();

        apply_impact(&mut state, &params, 0, x, true, f_i, zeta).unwrap();

        assert!(state.binaries[0].v.raw() > 0);
        assert!(state.binaries[1].v.raw() > 0);
        assert!(state.binaries[2].v.raw() > 0);
        assert!(state.binaries[0].v > state.binaries[1].v);
    }

    #[test]
    fn sell_lowers_v_everywhere() {
        let params = test_params();
        let mut state = EngineState::init(&params).unwrap();
        let x = Amount::from_decimal(dec!(100)).unwrap();
        let f_i = Ratio::from_decimal(dec!(0.8)).unwrap();
        let zeta = Ratio::from_decimal(dec!(0.1)).unwrap();

        apply_impact(&mut state, &params, 0, x, false, f_i, zeta).unwrap();

        assert!(state.binaries[0].v.raw() < 0);
        assert!(state.binaries[1].v.raw() < 0);
    }
}
