//! Market state: per-binary fields, LOB pools, and the aggregate
//! [`EngineState`].

pub mod binary;
pub mod engine_state;
pub mod lob;

pub use binary::Binary;
pub use engine_state::EngineState;
pub use lob::{DirectionKey, LobPool, PoolKey, SideKey};
