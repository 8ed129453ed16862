use std::collections::HashMap;

/// Supplies the signing secret for an identity. Opaque beyond present/absent;
/// key parsing and custody live with the collaborator.
pub trait WalletProvider: Send + Sync {
    fn secret(&self, identity: &str) -> Option<String>;
}

/// In-memory provider, for tests and single-user deployments
#[derive(Debug, Default)]
pub struct StaticWalletProvider {
    secrets: HashMap<String, String>,
}

impl StaticWalletProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, identity: &str, secret: &str) -> Self {
        self.secrets.insert(identity.to_string(), secret.to_string());
        self
    }
}

impl WalletProvider for StaticWalletProvider {
    fn secret(&self, identity: &str) -> Option<String> {
        self.secrets.get(identity).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_provider() {
        let provider = StaticWalletProvider::new().with_secret("user1", "s3cret");

        assert_eq!(provider.secret("user1").as_deref(), Some("s3cret"));
        assert!(provider.secret("user2").is_none());
    }
}
