//! Scaled-integer fixed-point arithmetic
//!
//! Every monetary/price quantity that feeds a pricing decision is represented
//! as an exact scaled integer (base 10, never binary floating point). This
//! module generalizes the teacher's old `core::fixed_point` (a single
//! `i64`/1e9-scale conversion helper for one asset) into a small family of
//! distinctly-typed scales so the type system catches unit-confusion: an
//! [`Amount`] (money/token quantity, 6 decimals) cannot be added to a
//! [`Price`] (4 decimals) without an explicit, named conversion.
//!
//! All arithmetic that can overflow or divide by zero returns
//! `Result<_, NumericErrorKind>` rather than panicking — mirrors the
//! teacher's `OverflowError`-returning `Position` update methods.

use crate::core::errors::NumericErrorKind;
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;
use std::fmt;

/// Collateral/token-quantity scale: 6 decimal places.
pub const AMOUNT_SCALE: i128 = 1_000_000;
/// Price scale: 4 decimal places.
pub const PRICE_SCALE: i128 = 10_000;
/// Scale used for dimensionless coefficients (ζ, μ, ν, κ, γ, σ, f, f_match).
/// Kept at the same precision as [`Amount`] so products stay exact.
pub const RATIO_SCALE: i128 = 1_000_000;

/// A real number represented as an exact integer multiple of `1/S`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Scaled<const S: i128>(i128);

pub type Amount = Scaled<AMOUNT_SCALE>;
pub type Price = Scaled<PRICE_SCALE>;
pub type Ratio = Scaled<RATIO_SCALE>;

impl<const S: i128> Scaled<S> {
    pub const ZERO: Self = Scaled(0);

    #[inline(always)]
    pub const fn from_raw(raw: i128) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub const fn raw(self) -> i128 {
        self.0
    }

    pub const fn decimals() -> u32 {
        let mut s = S;
        let mut d = 0u32;
        while s > 1 {
            s /= 10;
            d += 1;
        }
        d
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Smallest representable positive value (one raw unit).
    pub const fn epsilon() -> Self {
        Self(1)
    }

    pub fn checked_add(self, other: Self) -> Result<Self, NumericErrorKind> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(NumericErrorKind::Overflow)
    }

    pub fn checked_sub(self, other: Self) -> Result<Self, NumericErrorKind> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(NumericErrorKind::Overflow)
    }

    pub fn checked_neg(self) -> Result<Self, NumericErrorKind> {
        self.0.checked_neg().map(Self).ok_or(NumericErrorKind::Overflow)
    }

    pub fn saturating_sub_zero(self, other: Self) -> Self {
        if self.0 >= other.0 {
            Self(self.0 - other.0)
        } else {
            Self::ZERO
        }
    }

    /// Multiply by a dimensionless [`Ratio`], result at this type's scale.
    /// Rounds half-to-even at this scale.
    pub fn checked_mul_ratio(self, ratio: Ratio) -> Result<Self, NumericErrorKind> {
        mul_scaled(self.0, ratio.raw(), RATIO_SCALE).map(Self)
    }

    /// Divide by another quantity of the same scale, yielding a dimensionless
    /// [`Ratio`] (e.g. `p = q / L`). Rounds half-to-even at `Ratio`'s scale.
    pub fn checked_div_to_ratio(self, other: Self) -> Result<Ratio, NumericErrorKind> {
        safe_divide(self.0, other.0, RATIO_SCALE).map(Ratio)
    }

    /// Divide by a plain (dimensionless, non-fixed-point) integer, e.g.
    /// `Z / n_outcomes`. Rounds half-to-even at this type's own scale.
    pub fn checked_div_int(self, divisor: i128) -> Result<Self, NumericErrorKind> {
        if divisor == 0 {
            return Err(NumericErrorKind::DivisionByZero);
        }
        safe_div_round_half_even(self.0, divisor)
            .map(Self)
            .ok_or(NumericErrorKind::Overflow)
    }

    /// Multiply by a plain (dimensionless, non-fixed-point) integer, e.g. a
    /// tick count. Exact, no rounding.
    pub fn checked_mul_int(self, factor: i128) -> Result<Self, NumericErrorKind> {
        self.0
            .checked_mul(factor)
            .map(Self)
            .ok_or(NumericErrorKind::Overflow)
    }

    /// Rescale to a different fixed-point scale, rounding half-to-even.
    pub fn rescale<const T: i128>(self) -> Result<Scaled<T>, NumericErrorKind> {
        if T == S {
            return Ok(Scaled(self.0));
        }
        if T > S {
            let factor = T / S;
            self.0
                .checked_mul(factor)
                .map(Scaled)
                .ok_or(NumericErrorKind::Overflow)
        } else {
            let factor = S / T;
            safe_div_round_half_even(self.0, factor)
                .map(Scaled)
                .ok_or(NumericErrorKind::Overflow)
        }
    }

    /// Exact conversion from a [`rust_decimal::Decimal`] tunable, rounding
    /// half-to-even at this scale.
    pub fn from_decimal(value: Decimal) -> Result<Self, NumericErrorKind> {
        let decimals = Self::decimals();
        let multiplier = Decimal::from(10i64.checked_pow(decimals).ok_or(NumericErrorKind::Overflow)?);
        let scaled = value
            .checked_mul(multiplier)
            .ok_or(NumericErrorKind::Overflow)?;
        let rounded = scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        let raw: i128 = rounded.mantissa();
        let raw = if rounded.scale() == 0 {
            raw
        } else {
            raw / 10i128.pow(rounded.scale())
        };
        Ok(Self(raw))
    }

    /// Exact conversion back to [`rust_decimal::Decimal`] for wire/report use.
    pub fn to_decimal(self) -> Decimal {
        Decimal::from_i128_with_scale(self.0, Self::decimals())
    }
}

impl<const S: i128> PartialOrd for Scaled<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<const S: i128> Ord for Scaled<S> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<const S: i128> fmt::Debug for Scaled<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl<const S: i128> fmt::Display for Scaled<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decimals = Self::decimals() as usize;
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        if decimals == 0 {
            return write!(f, "{sign}{abs}");
        }
        let divisor = 10u128.pow(decimals as u32);
        let int_part = abs / divisor;
        let frac_part = abs % divisor;
        write!(f, "{sign}{int_part}.{frac_part:0width$}", width = decimals)
    }
}

/// Divide `n/d`, rounding half-to-even, returning `None` on overflow.
/// `d` may be negative.
pub fn safe_div_round_half_even(n: i128, d: i128) -> Option<i128> {
    if d == 0 {
        return None;
    }
    let (n, d) = if d < 0 { (n.checked_neg()?, d.checked_neg()?) } else { (n, d) };
    let q = n.div_euclid(d);
    let r = n.rem_euclid(d);
    let twice_r = r.checked_mul(2)?;
    if twice_r > d || (twice_r == d && (q & 1) != 0) {
        q.checked_add(1)
    } else {
        Some(q)
    }
}

/// `safe_divide(n, d)` per spec §4.1: fails `DivisionByZero` when `d == 0`;
/// otherwise computes `round_half_even(n * scale / d)`.
pub fn safe_divide(n: i128, d: i128, scale: i128) -> Result<i128, NumericErrorKind> {
    if d == 0 {
        return Err(NumericErrorKind::DivisionByZero);
    }
    let numerator = n.checked_mul(scale).ok_or(NumericErrorKind::Overflow)?;
    safe_div_round_half_even(numerator, d).ok_or(NumericErrorKind::Overflow)
}

/// Multiply two same-scale raw integers, rescaling back down by `scale`,
/// rounding half-to-even. Used to keep products of two `scale`-fixed-point
/// numbers at `scale` rather than `scale^2`.
pub fn mul_scaled(x: i128, y: i128, scale: i128) -> Result<i128, NumericErrorKind> {
    let widened = x.checked_mul(y).ok_or(NumericErrorKind::Overflow)?;
    safe_div_round_half_even(widened, scale).ok_or(NumericErrorKind::Overflow)
}

/// Integer square root (floor), via Newton's method seeded from a
/// nearest-power-of-two estimate, with a bit-accurate convergence criterion
/// (stop as soon as the iterate stops decreasing) and a fixed iteration cap
/// as a backstop against non-termination.
pub fn isqrt_i128(n: i128) -> i128 {
    debug_assert!(n >= 0, "isqrt_i128 requires a non-negative input");
    if n < 2 {
        return n.max(0);
    }
    let bits = 128 - n.leading_zeros();
    let mut x: i128 = 1i128 << bits.div_ceil(2).min(127);
    for _ in 0..128 {
        let y = (x + n / x) / 2;
        if y >= x {
            break;
        }
        x = y;
    }
    x
}

/// Solve `a*x^2 + b*x + c = 0` for its larger real root, given `a`, `b`, `c`
/// already expressed as raw integers at a shared precision `scale` (i.e. each
/// equal to `round(value * scale)`), returning the root likewise scaled.
///
/// Requires `a > 0`. Fails with [`NumericErrorKind::NegativeDiscriminant`] if
/// `b^2 - 4ac < 0` (shall not occur under the AMM's own contract, but the
/// caller must be able to detect it rather than silently producing garbage).
///
/// Derivation: with `A = a*scale`, `B = b*scale`, `C = c*scale`, the equation
/// `a*x^2+b*x+c=0` multiplied through by `scale^3` becomes
/// `A*X^2 + B*scale*X + C*scale^2 = 0` where `X = x*scale`, whose quadratic
/// formula collapses the `scale^2` inner-discriminant factor back out:
/// `X = scale*(sqrt(B^2 - 4AC) - B) / (2A)`.
pub fn solve_positive_quadratic(
    a: i128,
    b: i128,
    c: i128,
    scale: i128,
) -> Result<i128, NumericErrorKind> {
    if a <= 0 {
        return Err(NumericErrorKind::Overflow);
    }
    let b_sq = b.checked_mul(b).ok_or(NumericErrorKind::Overflow)?;
    let four_ac = 4i128
        .checked_mul(a)
        .and_then(|v| v.checked_mul(c))
        .ok_or(NumericErrorKind::Overflow)?;
    let inner_disc = b_sq
        .checked_sub(four_ac)
        .ok_or(NumericErrorKind::Overflow)?;
    if inner_disc < 0 {
        return Err(NumericErrorKind::NegativeDiscriminant);
    }
    let sqrt_inner = isqrt_i128(inner_disc);
    let numerator = scale
        .checked_mul(sqrt_inner.checked_sub(b).ok_or(NumericErrorKind::Overflow)?)
        .ok_or(NumericErrorKind::Overflow)?;
    let denom = 2i128.checked_mul(a).ok_or(NumericErrorKind::Overflow)?;
    safe_div_round_half_even(numerator, denom).ok_or(NumericErrorKind::Overflow)
}

/// Raises a [`Ratio`] to a small non-negative integer power via exponentiation
/// by squaring. Exact (no precision loss beyond the usual rounding of each
/// constituent multiply).
pub fn ratio_pow(base: Ratio, exp: u32) -> Result<Ratio, NumericErrorKind> {
    let mut result = Ratio::from_raw(RATIO_SCALE);
    let mut b = base;
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            result = result.checked_mul_ratio(b)?;
        }
        if e > 1 {
            b = b.checked_mul_ratio(b)?;
        }
        e >>= 1;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn decimals_match_declared_scale() {
        assert_eq!(Amount::decimals(), 6);
        assert_eq!(Price::decimals(), 4);
    }

    #[test]
    fn display_formats_fractional_part() {
        let a = Amount::from_raw(1_500_000);
        assert_eq!(format!("{a}"), "1.500000");
        let neg = Amount::from_raw(-500_000);
        assert_eq!(format!("{neg}"), "-0.500000");
    }

    #[test]
    fn decimal_roundtrip_is_exact() {
        let d = dec!(1234.567891);
        let amount = Amount::from_decimal(d).unwrap();
        assert_eq!(amount.to_decimal(), d);
    }

    #[test]
    fn half_even_rounding_ties_to_even() {
        assert_eq!(safe_div_round_half_even(1, 2), Some(0));
        assert_eq!(safe_div_round_half_even(3, 2), Some(2));
        assert_eq!(safe_div_round_half_even(5, 2), Some(2));
        assert_eq!(safe_div_round_half_even(-1, 2), Some(0));
        assert_eq!(safe_div_round_half_even(-3, 2), Some(-2));
        assert_eq!(safe_div_round_half_even(-5, 2), Some(-2));
    }

    #[test]
    fn safe_divide_rejects_zero_divisor() {
        assert_eq!(safe_divide(10, 0, 100), Err(NumericErrorKind::DivisionByZero));
    }

    #[test]
    fn isqrt_matches_known_squares() {
        assert_eq!(isqrt_i128(0), 0);
        assert_eq!(isqrt_i128(1), 1);
        assert_eq!(isqrt_i128(16_000_000), 4000);
        assert_eq!(isqrt_i128(25_000_000), 5000);
        // Non-perfect square floors correctly.
        assert_eq!(isqrt_i128(24), 4);
        assert_eq!(isqrt_i128(25), 5);
    }

    #[test]
    fn quadratic_solves_simple_case() {
        // x^2 + 3x - 4 = 0 -> roots -4, 1; positive root is 1.
        let scale = 1_000;
        let a = 1 * scale;
        let b = 3 * scale;
        let c = -4 * scale;
        let x = solve_positive_quadratic(a, b, c, scale).unwrap();
        assert_eq!(x, 1 * scale);
    }

    #[test]
    fn quadratic_rejects_negative_discriminant() {
        // x^2 + x + 1 = 0 has no real roots.
        let scale = 1_000;
        let err = solve_positive_quadratic(scale, scale, scale, scale).unwrap_err();
        assert_eq!(err, NumericErrorKind::NegativeDiscriminant);
    }
}
