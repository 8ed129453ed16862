//! Staged Auto-Trading Engine
//!
//! Runs one evaluation pass per user per tick over the user's tracked
//! tokens: buys in when a token has no entry price yet, then sells staged
//! tranches as price targets are hit, optionally re-arming the token once
//! price retraces to the entry. All external effects go through the injected
//! ports; the engine itself is deterministic given their responses.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::{TokenStatus, TrackedToken};
use crate::ports::execution::TradeExecutor;
use crate::ports::price::PriceOracle;
use crate::ports::store::{StoreError, UserStore};
use crate::ports::wallet::WalletProvider;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Fatal for the whole pass: nothing can trade without a signing secret
    #[error("No wallet configured for {0}")]
    WalletNotFound(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("User store error: {0}")]
    Store(#[from] StoreError),
}

/// What happened to one stage during a pass
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// Threshold met, sell confirmed
    Fired { stage: usize, tx_id: String },
    /// Threshold not met (or gated by the last sell price)
    Skipped { stage: usize },
    /// Threshold met but the sell was rejected
    Failed { stage: usize },
}

/// Per-token summary of one pass
#[derive(Debug, Clone, PartialEq)]
pub enum TokenOutcome {
    /// Permanent configuration defect; waits for the user to edit the token
    ConfigError,
    /// Fully sold with no repeat pending
    Idle,
    /// Price lookup failed; transient, retried next pass
    PriceUnavailable,
    /// Entry buy rejected; the entry is retried next pass
    EntryFailed,
    /// Entry buy confirmed this pass
    Entered,
    /// Stages evaluated (see the stage outcomes)
    Evaluated,
    /// Fully liquidated token re-armed for a fresh cycle
    Rearmed,
}

#[derive(Debug, Clone)]
pub struct TokenReport {
    pub address: String,
    pub outcome: TokenOutcome,
    pub stages: Vec<StageOutcome>,
}

/// Result of one full pass over a user's tokens
#[derive(Debug, Clone)]
pub struct PassReport {
    pub identity: String,
    pub tokens: Vec<TokenReport>,
}

impl PassReport {
    /// Count of sells confirmed during the pass
    pub fn fired_count(&self) -> usize {
        self.tokens
            .iter()
            .flat_map(|t| &t.stages)
            .filter(|s| matches!(s, StageOutcome::Fired { .. }))
            .count()
    }
}

/// Coordinates the ports into evaluation passes. Cheap to clone; clones share
/// the running flag.
pub struct AutoTradeEngine<O, E, S, W> {
    oracle: Arc<O>,
    executor: Arc<E>,
    store: Arc<S>,
    wallet: Arc<W>,
    is_running: Arc<RwLock<bool>>,
}

impl<O, E, S, W> Clone for AutoTradeEngine<O, E, S, W> {
    fn clone(&self) -> Self {
        Self {
            oracle: Arc::clone(&self.oracle),
            executor: Arc::clone(&self.executor),
            store: Arc::clone(&self.store),
            wallet: Arc::clone(&self.wallet),
            is_running: Arc::clone(&self.is_running),
        }
    }
}

impl<O, E, S, W> AutoTradeEngine<O, E, S, W>
where
    O: PriceOracle,
    E: TradeExecutor,
    S: UserStore,
    W: WalletProvider,
{
    pub fn new(oracle: Arc<O>, executor: Arc<E>, store: Arc<S>, wallet: Arc<W>) -> Self {
        Self {
            oracle,
            executor,
            store,
            wallet,
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    /// Run scheduled passes over every known user until stopped. Users are
    /// processed sequentially, so at most one pass per user is in flight.
    pub async fn run(&self, interval: Duration) -> Result<(), EngineError> {
        *self.is_running.write().await = true;
        tracing::info!("Auto-trade engine started, interval {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        while *self.is_running.read().await {
            ticker.tick().await;

            let identities: Vec<String> = self.store.load().await?.into_keys().collect();
            for identity in identities {
                match self.evaluate(&identity).await {
                    Ok(report) => {
                        if report.fired_count() > 0 {
                            tracing::info!(
                                "Pass for {}: {} stage(s) fired",
                                identity,
                                report.fired_count()
                            );
                        }
                    }
                    Err(EngineError::WalletNotFound(_)) => {
                        tracing::debug!("Skipping {}: no wallet configured", identity);
                    }
                    Err(e) => tracing::error!("Pass for {} failed: {}", identity, e),
                }
            }
        }

        tracing::info!("Auto-trade engine stopped");
        Ok(())
    }

    pub async fn stop(&self) {
        *self.is_running.write().await = false;
    }

    /// One evaluation pass for one user. Token order is the user's configured
    /// order; tokens are evaluated strictly in sequence. The whole settings
    /// object is persisted back in a single save at the end of the pass.
    pub async fn evaluate(&self, identity: &str) -> Result<PassReport, EngineError> {
        let mut records = self.store.load().await?;
        let record = records
            .get_mut(identity)
            .ok_or_else(|| EngineError::UnknownUser(identity.to_string()))?;

        let secret = self
            .wallet
            .secret(identity)
            .or_else(|| record.wallet_secret.clone())
            .ok_or_else(|| EngineError::WalletNotFound(identity.to_string()))?;

        let mut reports = Vec::with_capacity(record.settings.tokens.len());
        let repeat_on_entry = record.settings.repeat_on_entry;
        let stop_on_stage_failure = record.settings.stop_on_stage_failure;

        for token in &mut record.settings.tokens {
            let report = self
                .evaluate_token(token, &secret, repeat_on_entry, stop_on_stage_failure)
                .await;
            reports.push(report);
        }

        self.store.save(&records).await?;

        Ok(PassReport {
            identity: identity.to_string(),
            tokens: reports,
        })
    }

    async fn evaluate_token(
        &self,
        token: &mut TrackedToken,
        secret: &str,
        repeat_on_entry: bool,
        stop_on_stage_failure: bool,
    ) -> TokenReport {
        let address = token.address.clone();

        // Configuration gate: defects are permanent until the user edits
        if !token.is_valid_config() {
            token.status = TokenStatus::Error;
            return TokenReport {
                address,
                outcome: TokenOutcome::ConfigError,
                stages: Vec::new(),
            };
        }

        // Terminal check. A finished token stays idle unless the repeat
        // cycle can still re-arm it, which needs a price to compare.
        if token.finished {
            token.status = TokenStatus::Sold;
            if !(repeat_on_entry && token.fully_liquidates()) {
                return TokenReport {
                    address,
                    outcome: TokenOutcome::Idle,
                    stages: Vec::new(),
                };
            }
        }

        // Price fetch: transient on failure, nothing else is touched. A
        // finished token only needed the price for its repeat check, so it
        // keeps its sold state and sits the pass out.
        let price = match self.oracle.price(&token.address).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("Price lookup for {} failed: {}", token.address, e);
                if token.finished {
                    return TokenReport {
                        address,
                        outcome: TokenOutcome::Idle,
                        stages: Vec::new(),
                    };
                }
                token.status = TokenStatus::Error;
                return TokenReport {
                    address,
                    outcome: TokenOutcome::PriceUnavailable,
                    stages: Vec::new(),
                };
            }
        };

        // Entry step: the first successful buy pins the entry price
        let mut entered = false;
        if token.entry_price.is_none() {
            match self
                .executor
                .buy(&token.address, token.buy_amount, secret)
                .await
            {
                Ok(tx_id) => {
                    tracing::info!(
                        "Entered {} at {} (amount {}, tx {})",
                        token.address,
                        price,
                        token.buy_amount,
                        tx_id
                    );
                    token.entry_price = Some(price);
                    token.status = TokenStatus::Active;
                    token.current_stage = 0;
                    token.last_tx_id = Some(tx_id);
                    entered = true;
                }
                Err(e) => {
                    tracing::warn!("Entry buy for {} failed: {}", token.address, e);
                    token.status = TokenStatus::Error;
                    return TokenReport {
                        address,
                        outcome: TokenOutcome::EntryFailed,
                        stages: Vec::new(),
                    };
                }
            }
        }

        let entry_price = match token.entry_price {
            Some(p) => p,
            // Unreachable after the entry step, kept total for safety
            None => {
                return TokenReport {
                    address,
                    outcome: TokenOutcome::EntryFailed,
                    stages: Vec::new(),
                }
            }
        };

        let stages = self
            .evaluate_stages(token, entry_price, price, secret, stop_on_stage_failure)
            .await;

        // Repeat-on-entry: a fully liquidated plan re-arms once price
        // retraces to or below the original entry.
        if token.finished
            && repeat_on_entry
            && token.fully_liquidates()
            && price <= entry_price
        {
            tracing::info!(
                "Re-arming {}: price {} retraced to entry {}",
                token.address,
                price,
                entry_price
            );
            token.reset_cycle();
            return TokenReport {
                address,
                outcome: TokenOutcome::Rearmed,
                stages,
            };
        }

        TokenReport {
            address,
            outcome: if entered {
                TokenOutcome::Entered
            } else {
                TokenOutcome::Evaluated
            },
            stages,
        }
    }

    /// Walk the remaining stages in order. A stage fires when price clears
    /// its profit target and exceeds the last sell price, so oscillation
    /// around one threshold cannot fire the same tranche twice. A failed
    /// sell leaves later stages evaluable in the same pass unless
    /// `stop_on_stage_failure` is set.
    async fn evaluate_stages(
        &self,
        token: &mut TrackedToken,
        entry_price: f64,
        price: f64,
        secret: &str,
        stop_on_stage_failure: bool,
    ) -> Vec<StageOutcome> {
        let mut outcomes = Vec::new();

        for stage in token.current_stage..token.profit_percents.len() {
            let target = token.stage_target(entry_price, stage);
            let above_last_sell = match token.last_sell_price {
                Some(last) => price > last,
                None => true,
            };

            if price < target || !above_last_sell {
                outcomes.push(StageOutcome::Skipped { stage });
                continue;
            }

            let sell_amount = token.stage_sell_amount(stage);
            match self
                .executor
                .sell(&token.address, sell_amount, secret)
                .await
            {
                Ok(tx_id) => {
                    tracing::info!(
                        "Stage {} fired for {}: sold {} at {} (tx {})",
                        stage,
                        token.address,
                        sell_amount,
                        price,
                        tx_id
                    );
                    token.last_sell_price = Some(price);
                    token.current_stage = stage + 1;
                    token.last_tx_id = Some(tx_id.clone());
                    outcomes.push(StageOutcome::Fired { stage, tx_id });

                    if token.current_stage == token.profit_percents.len() {
                        token.finished = true;
                        token.status = TokenStatus::Sold;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Stage {} sell for {} failed: {}",
                        stage,
                        token.address,
                        e
                    );
                    token.status = TokenStatus::Error;
                    outcomes.push(StageOutcome::Failed { stage });
                    if stop_on_stage_failure {
                        break;
                    }
                }
            }
        }

        outcomes
    }
}
