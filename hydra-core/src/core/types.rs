//! Small discriminated-union types shared across the engine.
//!
//! Kept as plain `enum`s with explicit discriminants where it helps wire
//! stability — mirrors the teacher's `Side`/`OrderType`/`OrderStatus` style in
//! its old `core/types.rs`, generalized from a single-asset perp book to the
//! YES/NO binary model.

use std::fmt;

/// Which side of a binary a token or order refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Side {
    Yes = 0,
    No = 1,
}

impl Side {
    pub const fn opposite(self) -> Side {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
        }
    }
}

/// LOB order direction. Distinct from buy-YES/buy-NO: a direction applies to
/// whichever `Side` the order is on (e.g. `(Side::Yes, Direction::Sell)` is a
/// YES-sell pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Direction {
    Buy = 0,
    Sell = 1,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

/// Order kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum OrderKind {
    Market = 0,
    Limit = 1,
}

/// Lifecycle status of an order as reported back to the host via events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum OrderStatus {
    Open = 0,
    PartiallyFilled = 1,
    Filled = 2,
    Canceled = 3,
    Rejected = 4,
}

/// How a fill was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum FillType {
    Amm = 0,
    Lob = 1,
    Cross = 2,
    AutoFill = 3,
}

impl fmt::Display for FillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FillType::Amm => "AMM",
            FillType::Lob => "LOB",
            FillType::Cross => "CROSS",
            FillType::AutoFill => "AUTOFILL",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_opposite_is_involutive() {
        assert_eq!(Side::Yes.opposite(), Side::No);
        assert_eq!(Side::No.opposite(), Side::Yes);
        assert_eq!(Side::Yes.opposite().opposite(), Side::Yes);
    }

    #[test]
    fn side_serializes_as_integer_tag() {
        assert_eq!(serde_json::to_string(&Side::Yes).unwrap(), "0");
        assert_eq!(serde_json::to_string(&Side::No).unwrap(), "1");
    }
}
