//! Application Layer - Pass orchestration
//!
//! Wires the ports into scheduled evaluation passes, one per user per tick.

pub mod engine;

pub use engine::{
    AutoTradeEngine, EngineError, PassReport, StageOutcome, TokenOutcome, TokenReport,
};
