//! Ports Layer - Trait definitions for external collaborators
//!
//! Following hexagonal architecture, these traits abstract:
//! - Price feeds (price oracle)
//! - Trade execution (buy/sell)
//! - User record persistence (whole-snapshot load/save)
//! - Wallet secrets (present or absent, otherwise opaque)

pub mod execution;
pub mod mocks;
pub mod price;
pub mod store;
pub mod wallet;

pub use execution::{ExecutorError, TradeExecutor};
pub use price::{OracleError, PriceOracle};
pub use store::{StoreError, UserStore};
pub use wallet::{StaticWalletProvider, WalletProvider};
