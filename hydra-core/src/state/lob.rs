//! Tick-quantized limit order book pools.
//!
//! Pools are keyed by the full `(outcome, side, direction, tick, opt_in)`
//! tuple and held in a `BTreeMap` so iteration is always deterministic —
//! spec's design notes explicitly rule out insertion-ordered containers.

use crate::core::fixed_point::{Amount, Price};
use crate::core::ids::{Outcome, UserId};
use crate::core::types::{Direction, Side};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Number of low bits of the packed key magnitude reserved for `tick`. Wide
/// enough that no realistic `p_max/tick_size` ever overflows into the
/// outcome/side/direction bits above it.
const TICK_BITS: u32 = 40;
const TICK_MASK: i128 = (1i128 << TICK_BITS) - 1;

/// Full key identifying one LOB pool.
///
/// Serializes as a signed decimal string (§6 wire convention): the magnitude
/// packs `(outcome, side, direction, tick)`, and the sign carries `opt_in`
/// (positive = opt-in, negative = not opt-in) so the key round-trips through
/// a JSON object key, which `serde_json` requires to be a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolKey {
    pub outcome: Outcome,
    pub side: SideKey,
    pub direction: DirectionKey,
    pub tick: u64,
    pub opt_in: bool,
}

/// `Ord`-friendly mirror of [`Side`] (kept distinct so `core::types::Side`
/// stays free to evolve without touching pool-map ordering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SideKey {
    Yes,
    No,
}

impl From<Side> for SideKey {
    fn from(s: Side) -> Self {
        match s {
            Side::Yes => SideKey::Yes,
            Side::No => SideKey::No,
        }
    }
}

/// `Ord`-friendly mirror of [`Direction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DirectionKey {
    Buy,
    Sell,
}

impl From<Direction> for DirectionKey {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Buy => DirectionKey::Buy,
            Direction::Sell => DirectionKey::Sell,
        }
    }
}

impl PoolKey {
    pub fn new(outcome: Outcome, side: Side, direction: Direction, tick: u64, opt_in: bool) -> Self {
        Self {
            outcome,
            side: side.into(),
            direction: direction.into(),
            tick,
            opt_in,
        }
    }

    pub fn tick_price(&self, tick_size: Price) -> Result<Price, crate::core::errors::NumericErrorKind> {
        tick_size.checked_mul_int(self.tick as i128)
    }

    fn encode(&self) -> String {
        let mut magnitude = self.outcome as i128;
        magnitude = (magnitude << 1) | (self.side == SideKey::No) as i128;
        magnitude = (magnitude << 1) | (self.direction == DirectionKey::Sell) as i128;
        magnitude = (magnitude << TICK_BITS) | (self.tick as i128 & TICK_MASK);
        // Offset by 1 so the encoded magnitude is never zero, keeping the
        // sign meaningful for every key including outcome 0/YES/BUY/tick 0.
        let signed = if self.opt_in { magnitude + 1 } else { -(magnitude + 1) };
        signed.to_string()
    }

    fn decode(s: &str) -> Option<Self> {
        let signed: i128 = s.parse().ok()?;
        if signed == 0 {
            return None;
        }
        let opt_in = signed > 0;
        let magnitude = signed.unsigned_abs() as i128 - 1;
        let tick = (magnitude & TICK_MASK) as u64;
        let rest = magnitude >> TICK_BITS;
        let direction = if rest & 1 == 1 { DirectionKey::Sell } else { DirectionKey::Buy };
        let rest = rest >> 1;
        let side = if rest & 1 == 1 { SideKey::No } else { SideKey::Yes };
        let outcome = (rest >> 1) as usize;
        Some(PoolKey { outcome, side, direction, tick, opt_in })
    }
}

impl Serialize for PoolKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for PoolKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PoolKey::decode(&s).ok_or_else(|| DeError::custom(format!("invalid LOB pool key {s:?}")))
    }
}

/// One resting pool: committed volume plus each contributing user's share.
/// BUY pools store committed collateral in `volume`; SELL pools store
/// committed tokens. `shares` is always denominated in token-size units.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LobPool {
    pub volume: Amount,
    pub shares: BTreeMap<UserId, Amount>,
}

impl LobPool {
    pub fn is_empty(&self) -> bool {
        self.volume.is_zero() && self.shares.is_empty()
    }

    pub fn total_shares(&self) -> Result<Amount, crate::core::errors::NumericErrorKind> {
        let mut total = Amount::ZERO;
        for share in self.shares.values() {
            total = total.checked_add(*share)?;
        }
        Ok(total)
    }

    /// Adds `size` tokens of resting interest from `user`. `tick_price` is
    /// only used to compute the BUY-pool collateral delta.
    pub fn add(
        &mut self,
        user: UserId,
        size: Amount,
        tick_price: Price,
        direction: Direction,
    ) -> Result<(), crate::core::errors::NumericErrorKind> {
        let volume_delta = match direction {
            Direction::Buy => Amount::from_raw(crate::core::fixed_point::mul_scaled(
                size.raw(),
                tick_price.raw(),
                crate::core::fixed_point::PRICE_SCALE,
            )?),
            Direction::Sell => size,
        };
        self.volume = self.volume.checked_add(volume_delta)?;
        let entry = self.shares.entry(user).or_insert(Amount::ZERO);
        *entry = entry.checked_add(size)?;
        Ok(())
    }

    /// Removes all of `user`'s remaining share, returning the size
    /// (token-equivalent) withdrawn and the collateral/token volume
    /// refunded, pro-rata of whatever volume remains in the pool.
    pub fn cancel(
        &mut self,
        user: &str,
    ) -> Result<Option<(Amount, Amount)>, crate::core::errors::NumericErrorKind> {
        let Some(share) = self.shares.remove(user) else {
            return Ok(None);
        };
        let total_before = share.checked_add(self.total_shares()?)?;
        let refund = if total_before.is_zero() {
            Amount::ZERO
        } else {
            let ratio = share.checked_div_to_ratio(total_before)?;
            self.volume.checked_mul_ratio(ratio)?
        };
        self.volume = self.volume.saturating_sub_zero(refund);
        Ok(Some((share, refund)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_to_buy_pool_scales_volume_by_tick_price() {
        let mut pool = LobPool::default();
        let tick_price = Price::from_raw(5_500); // 0.5500
        pool.add("alice".into(), Amount::from_raw(100_000_000), tick_price, Direction::Buy)
            .unwrap();
        // 100 tokens * 0.55 = 55 collateral
        assert_eq!(pool.volume, Amount::from_raw(55_000_000));
    }

    #[test]
    fn add_to_sell_pool_volume_equals_shares() {
        let mut pool = LobPool::default();
        let tick_price = Price::from_raw(5_500);
        pool.add("alice".into(), Amount::from_raw(100_000_000), tick_price, Direction::Sell)
            .unwrap();
        assert_eq!(pool.volume, Amount::from_raw(100_000_000));
    }

    #[test]
    fn cancel_removes_share_and_refunds_remaining_volume() {
        let mut pool = LobPool::default();
        let tick_price = Price::from_raw(5_500);
        pool.add("alice".into(), Amount::from_raw(100_000_000), tick_price, Direction::Sell)
            .unwrap();
        let (share, refund) = pool.cancel("alice").unwrap().unwrap();
        assert_eq!(share, Amount::from_raw(100_000_000));
        assert_eq!(refund, Amount::from_raw(100_000_000));
        assert!(pool.is_empty());
    }

    #[test]
    fn cancel_unknown_user_is_none() {
        let mut pool = LobPool::default();
        assert!(pool.cancel("nobody").unwrap().is_none());
    }

    #[test]
    fn pool_key_round_trips_through_its_wire_string() {
        for key in [
            PoolKey::new(0, Side::Yes, Direction::Buy, 0, false),
            PoolKey::new(0, Side::Yes, Direction::Buy, 0, true),
            PoolKey::new(3, Side::No, Direction::Sell, 55, true),
            PoolKey::new(7, Side::Yes, Direction::Sell, 9_999, false),
        ] {
            let encoded = serde_json::to_string(&key).unwrap();
            let decoded: PoolKey = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, key);
        }
    }

    #[test]
    fn pool_key_serializes_as_a_json_string_not_a_struct() {
        let key = PoolKey::new(2, Side::No, Direction::Buy, 12, true);
        let encoded = serde_json::to_string(&key).unwrap();
        assert!(encoded.starts_with('"') && encoded.ends_with('"'));
    }

    #[test]
    fn lob_map_serializes_to_a_json_object() {
        let mut lob: BTreeMap<PoolKey, LobPool> = BTreeMap::new();
        let key = PoolKey::new(1, Side::Yes, Direction::Sell, 60, false);
        let mut pool = LobPool::default();
        pool.add("bob".into(), Amount::from_raw(80_000_000), Price::from_raw(6_000), Direction::Sell)
            .unwrap();
        lob.insert(key, pool);

        let encoded = serde_json::to_string(&lob).unwrap();
        let back: BTreeMap<PoolKey, LobPool> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(back, lob);
    }
}
