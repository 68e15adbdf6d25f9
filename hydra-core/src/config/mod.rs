//! Engine parameter types: static/time-interpolated tunables, validation,
//! and reserved sentinel constants.

pub mod constants;
pub mod params;

pub use params::{EffectiveParams, EngineParams, InterpolationMode, Interpolated};
