//! User Record
//!
//! The whole-user object persisted through the [`UserStore`](crate::ports::store::UserStore)
//! collaborator. Load/save operates on the full identity -> record map; no
//! partial-field update contract is assumed.

use serde::{Deserialize, Serialize};

use super::token::StrategySettings;

/// Everything the engine needs to know about one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Chat-platform identity, also keys the dedup ledger segment
    pub identity: String,
    /// Signing secret for the trade executor; absent means trading is disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_secret: Option<String>,
    #[serde(default)]
    pub settings: StrategySettings,
}

impl UserRecord {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            wallet_secret: None,
            settings: StrategySettings::default(),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.wallet_secret = Some(secret.into());
        self
    }
}
