//! Fill and event payloads returned to the host.

use crate::core::errors::InputErrorReason;
use crate::core::fixed_point::{Amount, Price, Ratio};
use crate::core::ids::{Outcome, TradeId, UserId};
use crate::core::types::{FillType, Side};
use serde::{Deserialize, Serialize};

/// One executed trade leg. CROSS fills carry both `price_yes` and
/// `price_no`; AMM/LOB/AUTOFILL fills populate only the traded side's price
/// via `price` and leave the other `price_*` field unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub trade_id: TradeId,
    pub buyer: UserId,
    pub seller: UserId,
    pub outcome: Outcome,
    pub side: Side,
    pub price: Price,
    pub size: Amount,
    pub fee: Amount,
    pub fill_type: FillType,
    pub price_yes: Option<Price>,
    pub price_no: Option<Price>,
    pub tick: Option<u64>,
    pub ts_ms: u64,
}

/// Why an order was rejected (recoverable, per-order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RejectReason {
    Input(InputErrorReason),
    Slippage { realized: Ratio, limit: Ratio },
}

/// One auto-fill execution against an opt-in resting pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoFillPayload {
    pub outcome: Outcome,
    pub side: Side,
    pub tick: u64,
    pub delta: Amount,
    pub surplus: Amount,
    pub rebates: Vec<(UserId, Amount)>,
}

/// One binary eliminated during an intermediate resolution round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EliminationPayload {
    pub outcome: Outcome,
    pub paid_no: Amount,
    pub freed: Amount,
}

/// Round-level summary emitted once per intermediate resolution call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRoundPayload {
    pub pre_sum_yes: Ratio,
    pub post_sum_yes: Ratio,
    pub capped_outcomes: Vec<Outcome>,
}

/// Emitted once when the market is finally settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionFinalPayload {
    pub winner: Outcome,
}

/// Emitted when a configured `ζ` would have made `f_i <= 0` and was clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZetaClampedPayload {
    pub outcome_count_active: usize,
    pub configured: Ratio,
    pub clamped_to: Ratio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventKind {
    OrderAccepted { order_id: crate::core::ids::OrderId },
    OrderRejected { order_id: crate::core::ids::OrderId, reason: RejectReason },
    Fill(Fill),
    CrossMatch(Fill),
    AutoFill(AutoFillPayload),
    Elimination(EliminationPayload),
    ResolutionRound(ResolutionRoundPayload),
    ResolutionFinal(ResolutionFinalPayload),
    ZetaClamped(ZetaClampedPayload),
}

/// A tagged, timestamped event as defined in spec §3.1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub kind: EventKind,
    pub ts_ms: u64,
}

impl Event {
    pub fn new(kind: EventKind, ts_ms: u64) -> Self {
        Self { kind, ts_ms }
    }
}
