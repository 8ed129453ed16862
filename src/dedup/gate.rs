//! Notification Gate
//!
//! Decides whether a candidate token has already been surfaced to a user
//! within the ledger's TTL window. First sighting records the digest and
//! lets the notification through; repeat sightings are suppressed.

use super::ledger::{digest, DedupLedger, LedgerError};

#[derive(Debug, Clone)]
pub struct NotificationGate {
    ledger: DedupLedger,
}

impl NotificationGate {
    pub fn new(ledger: DedupLedger) -> Self {
        Self { ledger }
    }

    /// Returns true once per token per TTL window for an identity. The read
    /// and the append take the advisory lock separately, so two racing
    /// processes can both see "unseen" and both notify; the ledger itself
    /// stays consistent (append is idempotent) and the lock is best-effort
    /// by contract, so the race costs at most a duplicate notification.
    pub async fn should_notify(&self, identity: &str, address: &str) -> Result<bool, LedgerError> {
        let hash = digest(address);
        let seen = self.ledger.read_valid(identity).await?;
        if seen.contains(&hash) {
            tracing::debug!("Suppressing duplicate notification for {}", identity);
            return Ok(false);
        }
        self.ledger.append(identity, &hash).await?;
        Ok(true)
    }
}
