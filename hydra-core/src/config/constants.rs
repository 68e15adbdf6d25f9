//! Reserved constants: sentinel counterparty ids and structural bounds.

use crate::core::ids::UserId;

/// Counterparty id recorded on AMM-leg fills (buy/sell against the pool).
pub const SYSTEM_AMM_ID: &str = "SYSTEM:AMM";

/// Counterparty id recorded on AUTOFILL-leg fills (the AMM side of an
/// auto-fill trade; the LOB side keeps the real user id of the pool owner).
pub const SYSTEM_AUTOFILL_ID: &str = "SYSTEM:AUTOFILL";

/// Returns the reserved AMM counterparty id as an owned [`UserId`].
pub fn system_amm_id() -> UserId {
    SYSTEM_AMM_ID.to_string()
}

/// Returns the reserved auto-fill counterparty id as an owned [`UserId`].
pub fn system_autofill_id() -> UserId {
    SYSTEM_AUTOFILL_ID.to_string()
}

/// Minimum and maximum number of outcomes an event may have.
pub const MIN_OUTCOMES: usize = 3;
pub const MAX_OUTCOMES: usize = 10;

/// Iteration cap for the asymptotic penalty's repeated-application loop
/// (spec §4.4: "repeat up to a fixed small bound and then saturate").
pub const PENALTY_MAX_ITERATIONS: u32 = 8;

/// Iteration cap for the auto-fill binary search over the fillable Δ
/// (spec §4.7 / §9: "bounded iteration count (e.g., 20)").
pub const AUTOFILL_SEARCH_ITERATIONS: u32 = 20;
