//! Domain Layer - Core business logic for the ladder trading engine
//!
//! Pure domain types with no external dependencies. All external
//! interactions happen through the ports layer.

pub mod token;
pub mod user;

pub use token::{StrategyError, StrategySettings, TokenStatus, TrackedToken, MAX_TRACKED_TOKENS};
pub use user::UserRecord;
