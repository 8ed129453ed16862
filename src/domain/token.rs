//! Tracked Token Model
//!
//! A `TrackedToken` is one user-configured take-profit ladder: a buy amount,
//! an ordered list of profit thresholds and the fraction to sell at each.
//! `StrategySettings` holds a user's full set of tracked tokens.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of live tracked tokens per user
pub const MAX_TRACKED_TOKENS: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum StrategyError {
    /// User already tracks 10 tokens
    #[error("Capacity exceeded: at most {MAX_TRACKED_TOKENS} tokens can be tracked")]
    CapacityExceeded,

    /// Address already present in the user's token set
    #[error("Duplicate token: {0} is already tracked")]
    DuplicateToken(String),
}

/// Lifecycle status of a tracked token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    /// Configured but not yet bought
    #[default]
    Pending,
    /// Entry buy confirmed, stages being evaluated
    Active,
    /// All stages sold
    Sold,
    /// Last evaluation hit a configuration defect or a transient failure
    Error,
}

/// One token's staged take-profit plan and its live state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedToken {
    /// Normalized token address, unique within a user's set
    pub address: String,
    /// Entry buy size in the base currency
    pub buy_amount: f64,
    /// Stage i fires when price >= entry_price * (1 + profit_percents[i] / 100)
    pub profit_percents: Vec<f64>,
    /// Stage i sells buy_amount * sold_percents[i] / 100; parallel to profit_percents
    pub sold_percents: Vec<f64>,
    /// Price at the moment the entry buy succeeded; cleared on repeat reset
    #[serde(default)]
    pub entry_price: Option<f64>,
    /// Price of the most recent stage sale; gates re-firing on oscillation
    #[serde(default)]
    pub last_sell_price: Option<f64>,
    /// True once every stage has sold and no repeat is pending
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub status: TokenStatus,
    /// Zero-based index of the next stage to evaluate
    #[serde(default)]
    pub current_stage: usize,
    /// Most recent transaction id, for audit/display
    #[serde(default)]
    pub last_tx_id: Option<String>,
}

impl TrackedToken {
    /// Create a fresh token in `Pending` state
    pub fn new(
        address: impl Into<String>,
        buy_amount: f64,
        profit_percents: Vec<f64>,
        sold_percents: Vec<f64>,
    ) -> Self {
        Self {
            address: address.into(),
            buy_amount,
            profit_percents,
            sold_percents,
            entry_price: None,
            last_sell_price: None,
            finished: false,
            status: TokenStatus::Pending,
            current_stage: 0,
            last_tx_id: None,
        }
    }

    /// Configuration gate: a token failing this is a permanent defect until
    /// the user edits it, never retried automatically.
    pub fn is_valid_config(&self) -> bool {
        !self.address.trim().is_empty()
            && self.buy_amount > 0.0
            && !self.profit_percents.is_empty()
            && self.profit_percents.len() == self.sold_percents.len()
    }

    /// Whether the stage plan fully liquidates the position when completed
    pub fn fully_liquidates(&self) -> bool {
        self.sold_percents.iter().sum::<f64>() >= 100.0
    }

    /// Target price for stage `i` given the recorded entry price. Scales
    /// before dividing so round-percent targets land exactly on the
    /// threshold (entry 100 at 10% is 110.0, not 110.00000000000001).
    pub fn stage_target(&self, entry_price: f64, stage: usize) -> f64 {
        entry_price * (100.0 + self.profit_percents[stage]) / 100.0
    }

    /// Amount to sell when stage `i` fires
    pub fn stage_sell_amount(&self, stage: usize) -> f64 {
        self.buy_amount * self.sold_percents[stage] / 100.0
    }

    /// Re-arm the token for a fresh entry/exit cycle (repeat-on-entry)
    pub fn reset_cycle(&mut self) {
        self.finished = false;
        self.entry_price = None;
        self.last_sell_price = None;
        self.status = TokenStatus::Pending;
        self.current_stage = 0;
        self.last_tx_id = None;
    }
}

/// A user's full auto-trading configuration. Token order is insertion order
/// and is the evaluation order for each pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySettings {
    pub tokens: Vec<TrackedToken>,
    /// Re-arm a fully liquidated token once price retraces to entry
    #[serde(default = "default_true")]
    pub repeat_on_entry: bool,
    /// Stop evaluating later stages in a pass after a sell failure
    #[serde(default)]
    pub stop_on_stage_failure: bool,
}

fn default_true() -> bool {
    true
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            repeat_on_entry: true,
            stop_on_stage_failure: false,
        }
    }
}

impl StrategySettings {
    /// Add a token, enforcing the 10-entry cap and address uniqueness
    pub fn add(&mut self, token: TrackedToken) -> Result<(), StrategyError> {
        if self.tokens.len() >= MAX_TRACKED_TOKENS {
            return Err(StrategyError::CapacityExceeded);
        }
        if self.tokens.iter().any(|t| t.address == token.address) {
            return Err(StrategyError::DuplicateToken(token.address));
        }
        self.tokens.push(token);
        Ok(())
    }

    /// Remove by address; removing an unknown address is a no-op
    pub fn remove(&mut self, address: &str) {
        self.tokens.retain(|t| t.address != address);
    }

    /// Clear all tokens, restoring the repeat-on-entry default
    pub fn reset(&mut self) {
        self.tokens.clear();
        self.repeat_on_entry = true;
    }

    pub fn get(&self, address: &str) -> Option<&TrackedToken> {
        self.tokens.iter().find(|t| t.address == address)
    }
}
