use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::UserRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to load user records: {0}")]
    LoadFailed(String),
    #[error("Failed to save user records: {0}")]
    SaveFailed(String),
}

/// Whole-snapshot user record persistence. Load returns the full
/// identity -> record map and save replaces it; no partial-field update
/// contract is assumed, so callers must keep at most one pass in flight
/// per user rather than rely on the store merging concurrent writes.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn load(&self) -> Result<HashMap<String, UserRecord>, StoreError>;
    async fn save(&self, records: &HashMap<String, UserRecord>) -> Result<(), StoreError>;
}
