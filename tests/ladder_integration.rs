//! End-to-end tests: full buy/sell ladder cycles through the engine with
//! mock collaborators, and the dedup ledger shared between two handles as
//! two processes would share it.

use std::collections::HashMap;
use std::sync::Arc;

use tempfile::tempdir;

use ladderbot::application::{AutoTradeEngine, StageOutcome, TokenOutcome};
use ladderbot::dedup::{digest, DedupLedger, LedgerConfig, NotificationGate};
use ladderbot::domain::{TokenStatus, TrackedToken, UserRecord};
use ladderbot::ports::mocks::{MemoryUserStore, MockExecutor, MockOracle};
use ladderbot::ports::{StaticWalletProvider, UserStore};

const MINT: &str = "So11111111111111111111111111111111111111112";

#[tokio::test]
async fn full_ladder_cycle_with_repeat() {
    let mut record = UserRecord::new("user1").with_secret("s3cret");
    record
        .settings
        .add(TrackedToken::new(MINT, 2.0, vec![10.0, 25.0], vec![50.0, 50.0]))
        .unwrap();

    let oracle = Arc::new(MockOracle::new().with_price(MINT, 100.0));
    let executor = Arc::new(MockExecutor::new());
    let store = Arc::new(MemoryUserStore::new().with_user(record));
    let engine = AutoTradeEngine::new(
        Arc::clone(&oracle),
        Arc::clone(&executor),
        Arc::clone(&store),
        Arc::new(StaticWalletProvider::new()),
    );

    // Pass 1: entry at 100
    let report = engine.evaluate("user1").await.unwrap();
    assert_eq!(report.tokens[0].outcome, TokenOutcome::Entered);

    // Pass 2: stage 0 at 110 sells half the position
    oracle.set_price(MINT, 110.0);
    let report = engine.evaluate("user1").await.unwrap();
    assert!(matches!(
        report.tokens[0].stages[0],
        StageOutcome::Fired { stage: 0, .. }
    ));

    // Pass 3: stage 1 at 126 completes the plan
    oracle.set_price(MINT, 126.0);
    engine.evaluate("user1").await.unwrap();

    let token = store.user("user1").unwrap().settings.tokens[0].clone();
    assert!(token.finished);
    assert_eq!(token.status, TokenStatus::Sold);

    // Sell amounts were 50% of the 2.0 buy each
    let sells: Vec<_> = executor
        .calls()
        .into_iter()
        .filter(|c| c.side == "sell")
        .collect();
    assert_eq!(sells.len(), 2);
    assert!(sells.iter().all(|c| (c.amount - 1.0).abs() < 1e-9));

    // Pass 4: retrace below entry re-arms the token
    oracle.set_price(MINT, 99.0);
    let report = engine.evaluate("user1").await.unwrap();
    assert_eq!(report.tokens[0].outcome, TokenOutcome::Rearmed);

    // Pass 5: a fresh entry begins the second cycle
    let report = engine.evaluate("user1").await.unwrap();
    assert_eq!(report.tokens[0].outcome, TokenOutcome::Entered);
    let token = store.user("user1").unwrap().settings.tokens[0].clone();
    assert_eq!(token.entry_price, Some(99.0));
}

#[tokio::test]
async fn two_users_trade_independently() {
    let oracle = Arc::new(
        MockOracle::new()
            .with_price("mint-a", 10.0)
            .with_price("mint-b", 20.0),
    );
    let executor = Arc::new(MockExecutor::new());
    let store = Arc::new(MemoryUserStore::new());

    let mut alice = UserRecord::new("alice").with_secret("alice-key");
    alice
        .settings
        .add(TrackedToken::new("mint-a", 1.0, vec![10.0], vec![100.0]))
        .unwrap();
    let mut bob = UserRecord::new("bob").with_secret("bob-key");
    bob.settings
        .add(TrackedToken::new("mint-b", 1.0, vec![10.0], vec![100.0]))
        .unwrap();

    let mut snapshot = HashMap::new();
    snapshot.insert("alice".to_string(), alice);
    snapshot.insert("bob".to_string(), bob);
    store.save(&snapshot).await.unwrap();

    let engine = AutoTradeEngine::new(
        Arc::clone(&oracle),
        Arc::clone(&executor),
        Arc::clone(&store),
        Arc::new(StaticWalletProvider::new()),
    );

    engine.evaluate("alice").await.unwrap();
    engine.evaluate("bob").await.unwrap();

    assert_eq!(
        store.user("alice").unwrap().settings.tokens[0].entry_price,
        Some(10.0)
    );
    assert_eq!(
        store.user("bob").unwrap().settings.tokens[0].entry_price,
        Some(20.0)
    );
}

#[tokio::test]
async fn ledger_shared_across_handles() {
    let dir = tempdir().unwrap();
    let mut config = LedgerConfig::default();
    config.lock.settle_ms = 1;

    // Two handles over the same directory, as two processes would have
    let writer = DedupLedger::with_config(dir.path(), config.clone());
    let reader = DedupLedger::with_config(dir.path(), config);

    let d = digest(MINT);
    writer.append("user1", &d).await.unwrap();

    let seen = reader.read_valid("user1").await.unwrap();
    assert!(seen.contains(&d));
}

#[tokio::test]
async fn gate_suppresses_after_restart() {
    let dir = tempdir().unwrap();
    let mut config = LedgerConfig::default();
    config.lock.settle_ms = 1;

    {
        let gate = NotificationGate::new(DedupLedger::with_config(dir.path(), config.clone()));
        assert!(gate.should_notify("user1", MINT).await.unwrap());
    }

    // A fresh gate over the same storage still remembers the sighting
    let gate = NotificationGate::new(DedupLedger::with_config(dir.path(), config));
    assert!(!gate.should_notify("user1", MINT).await.unwrap());
}
