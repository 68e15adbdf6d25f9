//! Hydra Core - Deterministic Multi-Outcome Prediction Market Engine
//!
//! Hydra prices N independent YES/NO sub-markets over a shared collateral
//! pool, with a hybrid execution model: a closed-form bonded-curve AMM, a
//! tick-quantized limit order book, YES/NO cross-matching within a binary,
//! and opt-in auto-fill that lets resting LOB liquidity ride a trigger
//! trade's cross-impact. Every operation is a pure function over an owned
//! [`EngineState`]: no aliasing, no callbacks into the state mid-mutation,
//! no host-language floating point.
//!
//! ## Core modules
//! - [`core`]: fixed-point arithmetic (`Amount`, `Price`, `Ratio`), id
//!   newtypes, shared enums, and the `EngineError` taxonomy.
//! - [`config`]: static and time-interpolated tunables (`EngineParams`) and
//!   reserved sentinel constants.
//! - [`state`]: the owned aggregate state (`EngineState`, per-binary fields,
//!   the LOB pool map).
//! - [`amm`]: the buy/sell cost quadratic and the asymptotic price penalty.
//! - [`impact`]: own- and cross-pool collateral diversion after an AMM leg.
//! - [`matching`]: LOB cross-match and market-order-vs-LOB walks.
//! - [`autofill`]: opt-in auto-fill against resting opt-in pools.
//! - [`pipeline`]: `apply_orders`, the deterministic per-batch entry point.
//! - [`resolution`]: `trigger_resolution`, intermediate elimination and
//!   final settlement.
//! - [`event`]: fill and event payloads returned to the host.

pub mod amm;
pub mod autofill;
pub mod config;
pub mod core;
pub mod event;
pub mod impact;
pub mod matching;
pub mod pipeline;
pub mod resolution;
pub mod state;
pub mod utils;

pub use core::{EngineError, Result};
pub use pipeline::{apply_orders, Order};
pub use resolution::{trigger_resolution, PositionsLookup, ResolutionMode};
pub use state::EngineState;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{EngineParams, InterpolationMode, Interpolated};
    pub use crate::core::{Amount, Direction, EngineError, FillType, OrderKind, Outcome, Price, Ratio, Side, UserId};
    pub use crate::event::{Event, EventKind, Fill, RejectReason};
    pub use crate::pipeline::{apply_orders, Order};
    pub use crate::resolution::{trigger_resolution, PositionsLookup, ResolutionMode};
    pub use crate::state::EngineState;
    pub use crate::utils::init_logger;
}
