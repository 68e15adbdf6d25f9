//! Error taxonomy for the engine core
//!
//! Every fallible engine operation returns [`EngineError`]. Variants are grouped
//! by the propagation policy described in the pipeline design: `InputError` and
//! `SlippageRejection` are recoverable (caught per-order inside `apply_orders` and
//! turned into an `ORDER_REJECTED` event); `NumericError`, `InvariantViolation`,
//! and `ResolutionError` are fatal and abort the whole call with the entry state
//! left untouched.

use crate::core::fixed_point::Price;
use crate::core::ids::OrderId;
use thiserror::Error;

/// Reason code for a recoverable per-order rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InputErrorReason {
    /// The order references an outcome index that does not exist.
    UnknownOutcome,
    /// The order references an outcome that has already been eliminated.
    InactiveOutcome,
    /// `size <= 0`.
    NonPositiveSize,
    /// A LIMIT order's `limit_price` fell outside `[p_min, p_max]` at the
    /// current tick size.
    LimitPriceOutOfRange,
    /// A MARKET order supplied a `limit_price` (undefined for MARKET orders).
    MarketOrderHasLimitPrice,
}

impl std::fmt::Display for InputErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InputErrorReason::UnknownOutcome => "unknown outcome index",
            InputErrorReason::InactiveOutcome => "outcome is inactive",
            InputErrorReason::NonPositiveSize => "size must be positive",
            InputErrorReason::LimitPriceOutOfRange => "limit price out of range",
            InputErrorReason::MarketOrderHasLimitPrice => {
                "market order must not specify a limit price"
            }
        };
        f.write_str(s)
    }
}

/// Reason code for a fatal arithmetic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericErrorKind {
    /// `solve_positive_quadratic` was asked to solve an equation with a
    /// negative discriminant. Should not occur under contract.
    NegativeDiscriminant,
    /// `safe_divide` was asked to divide by zero.
    DivisionByZero,
    /// The asymptotic penalty did not bound `p'` within the allotted
    /// iteration count.
    PenaltyDidNotConverge,
    /// A widened multiplication or addition overflowed its intermediate type.
    Overflow,
}

impl std::fmt::Display for NumericErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NumericErrorKind::NegativeDiscriminant => "negative discriminant",
            NumericErrorKind::DivisionByZero => "division by zero",
            NumericErrorKind::PenaltyDidNotConverge => {
                "asymptotic penalty failed to bound price within iteration budget"
            }
            NumericErrorKind::Overflow => "arithmetic overflow",
        };
        f.write_str(s)
    }
}

/// Reason code for a fatal state-invariant failure (checked at every boundary
/// in [`crate::state::engine_state::EngineState::validate`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolationKind {
    /// `L_i <= 0` for some binary.
    NonPositivePool { outcome: usize },
    /// `q_yes_eff_i + q_no_i >= 2*L_i` for some binary.
    SolvencyBreached { outcome: usize },
    /// `p_yes` or `p_no` fell outside `(0, p_max)` for some binary.
    PriceOutOfBounds { outcome: usize },
    /// `virtual_yes_i < 0` while `vc_enabled`.
    NegativeVirtualYes { outcome: usize },
    /// An LOB pool's cached volume disagreed with the sum of its shares.
    PoolVolumeMismatch { outcome: usize },
    /// `sum(subsidy_i over active i) > Z`.
    SubsidyBudgetExceeded,
}

impl std::fmt::Display for InvariantViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvariantViolationKind::NonPositivePool { outcome } => {
                write!(f, "binary {outcome}: L <= 0")
            }
            InvariantViolationKind::SolvencyBreached { outcome } => {
                write!(f, "binary {outcome}: q_yes_eff + q_no >= 2*L")
            }
            InvariantViolationKind::PriceOutOfBounds { outcome } => {
                write!(f, "binary {outcome}: price outside (0, p_max)")
            }
            InvariantViolationKind::NegativeVirtualYes { outcome } => {
                write!(f, "binary {outcome}: virtual_yes < 0")
            }
            InvariantViolationKind::PoolVolumeMismatch { outcome } => {
                write!(f, "binary {outcome}: LOB pool volume/share mismatch")
            }
            InvariantViolationKind::SubsidyBudgetExceeded => {
                write!(f, "sum of active subsidies exceeds Z")
            }
        }
    }
}

/// Reason code for a fatal resolution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionErrorKind {
    /// An elimination list's sizes did not sum to `N-1` across rounds.
    ScheduleMismatch,
    /// An elimination list named an already-inactive outcome.
    AlreadyInactive { outcome: usize },
    /// NO payout for an eliminated outcome would exceed its pool `L_k`.
    PayoutExceedsPool { outcome: usize },
    /// `trigger_resolution` was called with `mr_enabled == false` but
    /// `mode == Intermediate`.
    IntermediateResolutionDisabled,
}

impl std::fmt::Display for ResolutionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionErrorKind::ScheduleMismatch => {
                write!(f, "elimination schedule does not sum to N-1")
            }
            ResolutionErrorKind::AlreadyInactive { outcome } => {
                write!(f, "outcome {outcome} is already inactive")
            }
            ResolutionErrorKind::PayoutExceedsPool { outcome } => {
                write!(f, "NO payout for outcome {outcome} exceeds its pool")
            }
            ResolutionErrorKind::IntermediateResolutionDisabled => {
                write!(f, "intermediate resolution requested but mr_enabled is false")
            }
        }
    }
}

/// The engine's top-level error type.
///
/// `InputError` and `SlippageRejection` are recovered inside the pipeline and
/// never escape `apply_orders`/`trigger_resolution` as a `Result::Err` — they
/// are listed here because the pipeline constructs them internally before
/// converting them to `Event::OrderRejected`. Only the remaining three
/// variants are ever returned to the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("order {order_id:?} rejected: {reason}")]
    InputError {
        order_id: OrderId,
        reason: InputErrorReason,
    },

    #[error("order {order_id:?} rejected: slippage {realized} exceeds limit {limit}")]
    SlippageRejection {
        order_id: OrderId,
        realized: Price,
        limit: Price,
    },

    #[error("numeric error: {0}")]
    NumericError(NumericErrorKind),

    #[error("invariant violation: {0}")]
    InvariantViolation(InvariantViolationKind),

    #[error("resolution error: {0}")]
    ResolutionError(ResolutionErrorKind),
}

impl EngineError {
    /// True for the two kinds the pipeline recovers from per-order; false for
    /// the three fatal kinds that abort and roll back the whole call.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::InputError { .. } | EngineError::SlippageRejection { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_error_is_recoverable() {
        let err = EngineError::InputError {
            order_id: OrderId::new(1),
            reason: InputErrorReason::NonPositiveSize,
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn invariant_violation_is_not_recoverable() {
        let err = EngineError::InvariantViolation(InvariantViolationKind::SubsidyBudgetExceeded);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn display_messages_are_non_empty() {
        let err = EngineError::NumericError(NumericErrorKind::NegativeDiscriminant);
        assert!(!format!("{err}").is_empty());
    }
}
