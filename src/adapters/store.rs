//! JSON File User Store
//!
//! Whole-snapshot persistence of the identity -> record map as one JSON
//! file. A missing file is an empty map; writes go through a temp file and
//! rename so a crash mid-write never leaves a torn snapshot behind.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::UserRecord;
use crate::ports::store::{StoreError, UserStore};

#[derive(Debug, Clone)]
pub struct JsonUserStore {
    path: PathBuf,
}

impl JsonUserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl UserStore for JsonUserStore {
    async fn load(&self) -> Result<HashMap<String, UserRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| StoreError::LoadFailed(e.to_string()))?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&content).map_err(|e| StoreError::LoadFailed(e.to_string()))
    }

    async fn save(&self, records: &HashMap<String, UserRecord>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::SaveFailed(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(records)
            .map_err(|e| StoreError::SaveFailed(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| StoreError::SaveFailed(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::SaveFailed(e.to_string()))?;
        Ok(())
    }
}
