//! Core building blocks for the deterministic market engine
//!
//! - [`fixed_point`]: scaled-integer arithmetic (`Amount`, `Price`, `Ratio`) and
//!   the quadratic solver used by the AMM.
//! - [`errors`]: the `EngineError` taxonomy every fallible operation returns.
//! - [`ids`]: `OrderId`/`TradeId`/`UserId`/`Outcome` identifier types.
//! - [`types`]: small shared enums (`Side`, `Direction`, `OrderKind`, ...).

pub mod errors;
pub mod fixed_point;
pub mod ids;
pub mod types;

pub use errors::{EngineError, Result};
pub use fixed_point::{Amount, Price, Ratio};
pub use ids::{OrderId, Outcome, TradeId, UserId};
pub use types::{Direction, FillType, OrderKind, OrderStatus, Side};
