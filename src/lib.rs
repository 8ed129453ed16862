//! Ladderbot - Staged Take-Profit Ladder Trading Engine
//!
//! Watches user-selected tokens, buys in, and sells staged tranches as
//! profit targets are hit, optionally re-arming the cycle when price
//! retraces to the entry. A per-user dedup ledger suppresses duplicate
//! token notifications within a rolling 24h window.
//!
//! # Modules
//!
//! - `domain`: Core business logic (TrackedToken, StrategySettings, UserRecord)
//! - `dedup`: Dedup ledger, advisory file lock, notification gate
//! - `ports`: Trait abstractions (PriceOracle, TradeExecutor, UserStore, WalletProvider)
//! - `application`: AutoTradeEngine evaluation passes
//! - `adapters`: External implementations (HTTP services, JSON file store, env wallet)
//! - `config`: Configuration loading and validation

pub mod adapters;
pub mod application;
pub mod config;
pub mod dedup;
pub mod domain;
pub mod ports;
