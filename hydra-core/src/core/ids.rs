//! Identifier newtypes
//!
//! `OrderId`/`TradeId` are opaque, caller-supplied (or caller-echoed) handles;
//! the engine never generates them and never needs them to be unguessable, so
//! plain `u64` newtypes are enough — unlike the teacher's `OrderId`, which
//! self-generates from a timestamp/random/counter triple for a live exchange
//! connection, these are just stable keys chosen by the host.

use std::fmt;

/// Caller-assigned, stable order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl OrderId {
    #[inline(always)]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order#{}", self.0)
    }
}

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Identifier assigned by the engine to a generated fill, unique within one
/// `apply_orders` call's returned fill list. Not persisted across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TradeId(pub u64);

impl TradeId {
    #[inline(always)]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trade#{}", self.0)
    }
}

/// User identifier. A plain string so the host's own id scheme (UUID,
/// database row id, wallet address, ...) passes through untouched. Fills
/// involving the AMM or auto-fill use one of the reserved sentinel ids in
/// [`crate::config::constants`] as the counterparty.
pub type UserId = String;

/// Zero-based outcome index, `0..n_outcomes`.
pub type Outcome = usize;
