//! Ladderbot - Staged Take-Profit Ladder Trading Engine

mod adapters;
mod application;
mod config;
mod dedup;
mod domain;
mod ports;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use crate::adapters::{EnvWalletProvider, HttpPriceOracle, HttpTradeExecutor, JsonUserStore};
use crate::application::AutoTradeEngine;
use crate::config::{load_config, Config};
use crate::dedup::{DedupLedger, NotificationGate};
use crate::domain::{TrackedToken, UserRecord};
use crate::ports::store::UserStore;

#[derive(Parser)]
#[command(name = "ladderbot", about = "Staged take-profit ladder trading engine")]
struct CliApp {
    /// Path to config.toml
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Info-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run scheduled evaluation passes for all users
    Run,
    /// Add a token to a user's ladder
    AddToken {
        identity: String,
        address: String,
        /// Entry buy size in the base currency
        #[arg(long)]
        amount: f64,
        /// Comma-separated profit thresholds in percent, e.g. "10,25"
        #[arg(long)]
        profits: String,
        /// Comma-separated sell fractions in percent, parallel to --profits
        #[arg(long)]
        sells: String,
    },
    /// Remove a token from a user's ladder (no-op if absent)
    RemoveToken { identity: String, address: String },
    /// List a user's tracked tokens
    ListTokens { identity: String },
    /// Clear a user's tokens, restoring defaults
    Reset { identity: String },
    /// Ask the notification gate whether a token should be surfaced
    Check { identity: String, address: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present (secrets go here, not in config.toml)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    init_logging(app.verbose, app.debug);

    let config = load_config(&app.config).context("Failed to load configuration")?;

    match app.command {
        Command::Run => run_command(&config).await,
        Command::AddToken {
            identity,
            address,
            amount,
            profits,
            sells,
        } => add_token_command(&config, &identity, &address, amount, &profits, &sells).await,
        Command::RemoveToken { identity, address } => {
            remove_token_command(&config, &identity, &address).await
        }
        Command::ListTokens { identity } => list_tokens_command(&config, &identity).await,
        Command::Reset { identity } => reset_command(&config, &identity).await,
        Command::Check { identity, address } => check_command(&config, &identity, &address).await,
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };

    fmt().with_env_filter(filter).init();
}

fn user_store(config: &Config) -> JsonUserStore {
    let path = shellexpand::tilde(&config.storage.users_file).to_string();
    JsonUserStore::new(path)
}

fn ledger(config: &Config) -> DedupLedger {
    let dir = shellexpand::tilde(&config.storage.ledger_dir).to_string();
    DedupLedger::with_config(dir, config.dedup.to_ledger_config())
}

async fn run_command(config: &Config) -> Result<()> {
    tracing::info!("Starting ladderbot engine...");

    let oracle = HttpPriceOracle::new(config.services.price_url.clone())
        .context("Failed to create price oracle")?;
    let executor = HttpTradeExecutor::new(config.services.swap_url.clone())
        .context("Failed to create trade executor")?;

    let engine = AutoTradeEngine::new(
        Arc::new(oracle),
        Arc::new(executor),
        Arc::new(user_store(config)),
        Arc::new(EnvWalletProvider::new()),
    );

    // Ctrl+C stops the pass loop after the in-flight pass completes
    let stopper = engine.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            stopper.stop().await;
        }
    });

    engine
        .run(config.engine.interval())
        .await
        .context("Engine pass loop failed")?;
    Ok(())
}

fn parse_percents(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid percent value '{}'", part))
        })
        .collect()
}

async fn add_token_command(
    config: &Config,
    identity: &str,
    address: &str,
    amount: f64,
    profits: &str,
    sells: &str,
) -> Result<()> {
    let profits = parse_percents(profits)?;
    let sells = parse_percents(sells)?;
    if profits.len() != sells.len() {
        bail!(
            "--profits and --sells must have the same number of stages ({} vs {})",
            profits.len(),
            sells.len()
        );
    }

    let token = TrackedToken::new(address, amount, profits, sells);
    if !token.is_valid_config() {
        bail!("Invalid token configuration: address, amount and stages must be set");
    }

    let store = user_store(config);
    let mut records = store.load().await?;
    let record = records
        .entry(identity.to_string())
        .or_insert_with(|| UserRecord::new(identity));
    record
        .settings
        .add(token)
        .with_context(|| format!("Cannot add {} for {}", address, identity))?;
    store.save(&records).await?;

    println!("Tracking {} for {}", address, identity);
    Ok(())
}

async fn remove_token_command(config: &Config, identity: &str, address: &str) -> Result<()> {
    let store = user_store(config);
    let mut records = store.load().await?;
    if let Some(record) = records.get_mut(identity) {
        record.settings.remove(address);
        store.save(&records).await?;
    }

    println!("No longer tracking {} for {}", address, identity);
    Ok(())
}

async fn list_tokens_command(config: &Config, identity: &str) -> Result<()> {
    let store = user_store(config);
    let records: HashMap<String, UserRecord> = store.load().await?;

    match records.get(identity) {
        Some(record) if !record.settings.tokens.is_empty() => {
            for token in &record.settings.tokens {
                println!(
                    "{}  buy={}  stage {}/{}  status={:?}{}",
                    token.address,
                    token.buy_amount,
                    token.current_stage,
                    token.profit_percents.len(),
                    token.status,
                    token
                        .entry_price
                        .map(|p| format!("  entry={}", p))
                        .unwrap_or_default(),
                );
            }
        }
        _ => println!("No tracked tokens for {}", identity),
    }
    Ok(())
}

async fn reset_command(config: &Config, identity: &str) -> Result<()> {
    let store = user_store(config);
    let mut records = store.load().await?;
    if let Some(record) = records.get_mut(identity) {
        record.settings.reset();
        store.save(&records).await?;
    }

    println!("Cleared tracked tokens for {}", identity);
    Ok(())
}

async fn check_command(config: &Config, identity: &str, address: &str) -> Result<()> {
    let gate = NotificationGate::new(ledger(config));
    if gate.should_notify(identity, address).await? {
        println!("notify");
    } else {
        println!("suppress");
    }
    Ok(())
}
