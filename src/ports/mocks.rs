//! Recording mocks for the port traits, used by unit and integration tests.
//! Each mock scripts responses per address and records the calls it receives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::UserRecord;

use super::execution::{ExecutorError, TradeExecutor};
use super::price::{OracleError, PriceOracle};
use super::store::{StoreError, UserStore};

/// Mock price oracle with scripted per-address prices
#[derive(Debug, Default, Clone)]
pub struct MockOracle {
    prices: Arc<Mutex<HashMap<String, f64>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(self, address: &str, price: f64) -> Self {
        self.prices.lock().unwrap().insert(address.to_string(), price);
        self
    }

    /// Update a scripted price between passes
    pub fn set_price(&self, address: &str, price: f64) {
        self.prices.lock().unwrap().insert(address.to_string(), price);
    }

    /// Make subsequent lookups for an address fail
    pub fn clear_price(&self, address: &str) {
        self.prices.lock().unwrap().remove(address);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    async fn price(&self, address: &str) -> Result<f64, OracleError> {
        self.calls.lock().unwrap().push(address.to_string());
        self.prices
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .ok_or_else(|| OracleError::PriceUnavailable(address.to_string()))
    }
}

/// One recorded trade attempt
#[derive(Debug, Clone, PartialEq)]
pub struct TradeCall {
    pub side: &'static str, // "buy" | "sell"
    pub address: String,
    pub amount: f64,
}

/// Mock trade executor. Succeeds with generated tx ids unless an address is
/// scripted to fail.
#[derive(Debug, Default, Clone)]
pub struct MockExecutor {
    failing: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<TradeCall>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure(self, address: &str, reason: &str) -> Self {
        self.failing
            .lock()
            .unwrap()
            .insert(address.to_string(), reason.to_string());
        self
    }

    pub fn set_failure(&self, address: &str, reason: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(address.to_string(), reason.to_string());
    }

    pub fn clear_failure(&self, address: &str) {
        self.failing.lock().unwrap().remove(address);
    }

    pub fn calls(&self) -> Vec<TradeCall> {
        self.calls.lock().unwrap().clone()
    }

    fn attempt(
        &self,
        side: &'static str,
        address: &str,
        amount: f64,
    ) -> Result<String, ExecutorError> {
        let call_no = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(TradeCall {
                side,
                address: address.to_string(),
                amount,
            });
            calls.len()
        };

        if let Some(reason) = self.failing.lock().unwrap().get(address) {
            return Err(ExecutorError::Rejected(reason.clone()));
        }
        Ok(format!("tx-{}-{}", side, call_no))
    }
}

#[async_trait]
impl TradeExecutor for MockExecutor {
    async fn buy(
        &self,
        address: &str,
        amount: f64,
        _secret: &str,
    ) -> Result<String, ExecutorError> {
        self.attempt("buy", address, amount)
    }

    async fn sell(
        &self,
        address: &str,
        amount: f64,
        _secret: &str,
    ) -> Result<String, ExecutorError> {
        self.attempt("sell", address, amount)
    }
}

/// In-memory user store with whole-snapshot semantics
#[derive(Debug, Default, Clone)]
pub struct MemoryUserStore {
    records: Arc<Mutex<HashMap<String, UserRecord>>>,
    save_count: Arc<Mutex<usize>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, record: UserRecord) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(record.identity.clone(), record);
        self
    }

    pub fn user(&self, identity: &str) -> Option<UserRecord> {
        self.records.lock().unwrap().get(identity).cloned()
    }

    pub fn save_count(&self) -> usize {
        *self.save_count.lock().unwrap()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn load(&self) -> Result<HashMap<String, UserRecord>, StoreError> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn save(&self, records: &HashMap<String, UserRecord>) -> Result<(), StoreError> {
        *self.records.lock().unwrap() = records.clone();
        *self.save_count.lock().unwrap() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_oracle() {
        let oracle = MockOracle::new().with_price("mint1", 1.5);

        assert_eq!(oracle.price("mint1").await.unwrap(), 1.5);
        assert!(oracle.price("mint2").await.is_err());
        assert_eq!(oracle.calls(), vec!["mint1".to_string(), "mint2".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_executor_records_calls() {
        let executor = MockExecutor::new().with_failure("bad", "no route");

        let tx = executor.buy("mint1", 1.0, "secret").await.unwrap();
        assert!(tx.starts_with("tx-buy-"));

        let err = executor.sell("bad", 0.5, "secret").await.unwrap_err();
        assert!(matches!(err, ExecutorError::Rejected(_)));

        let calls = executor.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].side, "buy");
        assert_eq!(calls[1].side, "sell");
        assert_eq!(calls[1].amount, 0.5);
    }

    #[tokio::test]
    async fn test_memory_store_snapshot() {
        let store = MemoryUserStore::new().with_user(UserRecord::new("user1"));

        let mut snapshot = store.load().await.unwrap();
        snapshot.insert("user2".to_string(), UserRecord::new("user2"));
        store.save(&snapshot).await.unwrap();

        assert!(store.user("user2").is_some());
        assert_eq!(store.save_count(), 1);
    }
}
