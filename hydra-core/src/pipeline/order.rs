//! Inbound order representation for `apply_orders`.

use crate::core::fixed_point::{Amount, Price, Ratio};
use crate::core::ids::{Outcome, OrderId, UserId};
use crate::core::types::{Direction, OrderKind, Side};
use serde::{Deserialize, Serialize};

/// One order submitted by the host for this batch. `(ts_ms, order_id)` gives
/// the deterministic total order orders are applied in (spec §4.8.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub outcome: Outcome,
    pub side: Side,
    pub direction: Direction,
    pub kind: OrderKind,
    pub size: Amount,
    /// Required for LIMIT orders (tick price); ignored for MARKET.
    pub limit_price: Option<Price>,
    /// Whether a resting LIMIT order is eligible for auto-fill (spec §4.7).
    pub af_opt_in: bool,
    /// Maximum acceptable slippage for a MARKET order, as a fraction of the
    /// pre-trade price. `None` means no slippage check.
    pub max_slippage: Option<Ratio>,
    pub ts_ms: u64,
}
