//! Adapters Layer - Concrete implementations of the ports
//!
//! Thin clients only: transport reliability (retries, backoff) belongs to
//! the services behind them.

pub mod executor;
pub mod price;
pub mod store;
pub mod wallet;

pub use executor::HttpTradeExecutor;
pub use price::HttpPriceOracle;
pub use store::JsonUserStore;
pub use wallet::EnvWalletProvider;
