//! Environment Wallet Provider
//!
//! Resolves a user's signing secret from `LADDERBOT_SECRET_<IDENTITY>`,
//! with the identity upper-cased and non-alphanumeric characters mapped to
//! underscores. Secrets live in the environment (or `.env`), never in the
//! persisted user store file unless the operator puts them there.

use crate::ports::wallet::WalletProvider;

const ENV_PREFIX: &str = "LADDERBOT_SECRET_";

#[derive(Debug, Default, Clone)]
pub struct EnvWalletProvider;

impl EnvWalletProvider {
    pub fn new() -> Self {
        Self
    }

    fn env_key(identity: &str) -> String {
        let normalized: String = identity
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{}", ENV_PREFIX, normalized)
    }
}

impl WalletProvider for EnvWalletProvider {
    fn secret(&self, identity: &str) -> Option<String> {
        std::env::var(Self::env_key(identity)).ok()
    }
}
