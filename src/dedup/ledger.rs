//! Dedup Ledger
//!
//! Per-identity append-only record store of previously seen token digests,
//! with 24h TTL expiry and capacity-bounded eviction. Each identity's ledger
//! is one JSON file guarded by the advisory lock in [`super::lock`]. The
//! component favors availability over strict durability: malformed persisted
//! content reads as empty, and a persist that keeps failing after retries is
//! logged and swallowed.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::lock::{self, LockConfig, LockError};
use super::now_ms;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    #[error("Failed to persist ledger: {0}")]
    PersistFailed(String),
}

/// One sighting of a token digest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DedupRecord {
    pub hash: String,
    /// Epoch milliseconds at first sighting
    pub ts: i64,
}

/// Tunables for TTL and capacity eviction
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Records older than this are discarded on read and append
    pub ttl_ms: i64,
    /// Steady-state trim: at this count, drop the oldest `trim_count`
    pub trim_threshold: usize,
    pub trim_count: usize,
    /// Hard backstop: never keep more than this many records
    pub hard_cap: usize,
    /// Persist retry attempts with linear backoff `retry_base * attempt`
    pub persist_retries: u32,
    pub retry_base: Duration,
    pub lock: LockConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 86_400_000,
            trim_threshold: 3_000,
            trim_count: 10,
            hard_cap: 6_000,
            persist_retries: 3,
            retry_base: Duration::from_millis(50),
            lock: LockConfig::default(),
        }
    }
}

/// Normalized one-way digest of a token address. Case and surrounding
/// whitespace differences map to the same digest, so the ledger never holds
/// a raw address in a reversible form.
pub fn digest(address: &str) -> String {
    let normalized = address.trim().to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// File-backed dedup ledger, one JSON segment per identity
#[derive(Debug, Clone)]
pub struct DedupLedger {
    dir: PathBuf,
    config: LedgerConfig,
}

impl DedupLedger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            config: LedgerConfig::default(),
        }
    }

    pub fn with_config(dir: impl Into<PathBuf>, config: LedgerConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
        }
    }

    fn segment_path(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{}.json", identity))
    }

    fn marker_path(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", identity))
    }

    /// Load the surviving digests for `identity`: everything persisted that
    /// has not aged past the TTL. If pruning changed the record count the
    /// pruned set is written back (best effort) before the lock is released.
    pub async fn read_valid(&self, identity: &str) -> Result<HashSet<String>, LedgerError> {
        let _guard = lock::acquire(&self.marker_path(identity), &self.config.lock).await?;

        let records = self.load_records(identity);
        let pruned = self.prune_expired(&records, now_ms());

        if pruned.len() != records.len() {
            self.persist_with_retries(identity, &pruned).await;
        }

        Ok(pruned.into_iter().map(|r| r.hash).collect())
    }

    /// Record a sighting of `hash` for `identity`. Idempotent: appending a
    /// digest that is already present leaves the ledger unchanged.
    pub async fn append(&self, identity: &str, hash: &str) -> Result<(), LedgerError> {
        let _guard = lock::acquire(&self.marker_path(identity), &self.config.lock).await?;

        let records = self.load_records(identity);
        let mut records = self.prune_expired(&records, now_ms());

        if records.iter().any(|r| r.hash == hash) {
            return Ok(());
        }

        records.push(DedupRecord {
            hash: hash.to_string(),
            ts: now_ms(),
        });
        self.apply_capacity(&mut records);

        self.persist_with_retries(identity, &records).await;
        Ok(())
    }

    /// Malformed or missing content reads as an empty ledger
    fn load_records(&self, identity: &str) -> Vec<DedupRecord> {
        let path = self.segment_path(identity);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        match serde_json::from_str::<Vec<DedupRecord>>(&content) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    "Ledger segment {} is malformed, treating as empty: {}",
                    path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Keep records strictly younger than the TTL as of `now`; a record
    /// exactly TTL old is already expired.
    fn prune_expired(&self, records: &[DedupRecord], now: i64) -> Vec<DedupRecord> {
        records
            .iter()
            .filter(|r| now - r.ts < self.config.ttl_ms)
            .cloned()
            .collect()
    }

    /// Two independent safety nets: a steady-state trim of the oldest few at
    /// the soft threshold, then a hard truncation to the newest `hard_cap`.
    fn apply_capacity(&self, records: &mut Vec<DedupRecord>) {
        if records.len() >= self.config.trim_threshold {
            let drop = self.config.trim_count.min(records.len());
            records.drain(..drop);
        }
        if records.len() > self.config.hard_cap {
            let excess = records.len() - self.config.hard_cap;
            records.drain(..excess);
        }
    }

    /// Linear-backoff persist; exhausted retries are logged and swallowed.
    /// Loss is bounded to the most recent append.
    async fn persist_with_retries(&self, identity: &str, records: &[DedupRecord]) {
        for attempt in 1..=self.config.persist_retries {
            match self.persist(identity, records) {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(
                        "Ledger persist attempt {}/{} for {} failed: {}",
                        attempt,
                        self.config.persist_retries,
                        identity,
                        e
                    );
                    if attempt < self.config.persist_retries {
                        tokio::time::sleep(self.config.retry_base * attempt).await;
                    }
                }
            }
        }
        tracing::error!(
            "Giving up persisting ledger segment for {} after {} attempts",
            identity,
            self.config.persist_retries
        );
    }

    fn persist(&self, identity: &str, records: &[DedupRecord]) -> Result<(), LedgerError> {
        fs::create_dir_all(&self.dir).map_err(|e| LedgerError::PersistFailed(e.to_string()))?;
        let content = serde_json::to_string(records)
            .map_err(|e| LedgerError::PersistFailed(e.to_string()))?;
        fs::write(self.segment_path(identity), content)
            .map_err(|e| LedgerError::PersistFailed(e.to_string()))
    }

    /// Test/seed helper: write raw records without locking
    #[doc(hidden)]
    pub fn seed(&self, identity: &str, records: &[DedupRecord]) -> Result<(), LedgerError> {
        self.persist(identity, records)
    }

    /// Path of an identity's ledger segment, for diagnostics
    pub fn segment_for(&self, identity: &str) -> PathBuf {
        self.segment_path(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn fast_ledger(dir: &Path) -> DedupLedger {
        let mut config = LedgerConfig::default();
        config.lock.settle_ms = 1;
        config.lock.poll_ms = 5;
        DedupLedger::with_config(dir, config)
    }

    #[test]
    fn test_digest_normalization() {
        let base = digest("So11111111111111111111111111111111111111112");
        assert_eq!(digest("  So11111111111111111111111111111111111111112  "), base);
        assert_eq!(digest("SO11111111111111111111111111111111111111112"), base);
        assert_eq!(digest("so11111111111111111111111111111111111111112"), base);
        assert_ne!(digest("other"), base);
    }

    #[test]
    fn test_digest_is_hex_sha256() {
        let d = digest("mint");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_append_and_read() {
        let dir = tempdir().unwrap();
        let ledger = fast_ledger(dir.path());

        let d = digest("mint1");
        ledger.append("user1", &d).await.unwrap();

        let valid = ledger.read_valid("user1").await.unwrap();
        assert!(valid.contains(&d));
        assert_eq!(valid.len(), 1);
    }

    #[tokio::test]
    async fn test_append_idempotent() {
        let dir = tempdir().unwrap();
        let ledger = fast_ledger(dir.path());

        let d = digest("mint1");
        ledger.append("user1", &d).await.unwrap();
        ledger.append("user1", &d).await.unwrap();

        let valid = ledger.read_valid("user1").await.unwrap();
        assert_eq!(valid.len(), 1);
    }

    #[test]
    fn test_ttl_boundary() {
        // Fixed clock: the 1ms boundary must not depend on how long lock
        // acquisition or the test runtime takes.
        let dir = tempdir().unwrap();
        let ledger = fast_ledger(dir.path());
        let now = now_ms();

        let records = [
            DedupRecord {
                hash: "expired".to_string(),
                ts: now - 86_400_001,
            },
            DedupRecord {
                hash: "exactly-ttl".to_string(),
                ts: now - 86_400_000,
            },
            DedupRecord {
                hash: "alive".to_string(),
                ts: now - 86_399_999,
            },
        ];

        let surviving = ledger.prune_expired(&records, now);
        let hashes: Vec<&str> = surviving.iter().map(|r| r.hash.as_str()).collect();
        assert_eq!(hashes, vec!["alive"]);
    }

    #[tokio::test]
    async fn test_read_valid_drops_expired() {
        let dir = tempdir().unwrap();
        let ledger = fast_ledger(dir.path());
        let now = now_ms();

        ledger
            .seed(
                "user1",
                &[
                    DedupRecord {
                        hash: "expired".to_string(),
                        ts: now - 86_400_000 - 60_000,
                    },
                    DedupRecord {
                        hash: "alive".to_string(),
                        ts: now - 86_400_000 + 60_000,
                    },
                ],
            )
            .unwrap();

        let valid = ledger.read_valid("user1").await.unwrap();
        assert!(!valid.contains("expired"));
        assert!(valid.contains("alive"));
    }

    #[tokio::test]
    async fn test_prune_writes_back() {
        let dir = tempdir().unwrap();
        let ledger = fast_ledger(dir.path());
        let now = now_ms();

        ledger
            .seed(
                "user1",
                &[
                    DedupRecord {
                        hash: "expired".to_string(),
                        ts: now - 200_000_000,
                    },
                    DedupRecord {
                        hash: "alive".to_string(),
                        ts: now,
                    },
                ],
            )
            .unwrap();

        ledger.read_valid("user1").await.unwrap();

        // The pruned set was persisted before the lock released
        let content = fs::read_to_string(ledger.segment_for("user1")).unwrap();
        let records: Vec<DedupRecord> = serde_json::from_str(&content).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hash, "alive");
    }

    #[tokio::test]
    async fn test_malformed_segment_reads_empty() {
        let dir = tempdir().unwrap();
        let ledger = fast_ledger(dir.path());

        fs::create_dir_all(dir.path()).unwrap();
        fs::write(ledger.segment_for("user1"), "{ not json ]").unwrap();

        let valid = ledger.read_valid("user1").await.unwrap();
        assert!(valid.is_empty());
    }

    #[tokio::test]
    async fn test_capacity_trim_at_threshold() {
        let dir = tempdir().unwrap();
        let mut config = LedgerConfig::default();
        config.lock.settle_ms = 1;
        // Scaled-down thresholds, same policy shape
        config.trim_threshold = 30;
        config.trim_count = 10;
        config.hard_cap = 60;
        let ledger = DedupLedger::with_config(dir.path(), config);

        let now = now_ms();
        let records: Vec<DedupRecord> = (0..29)
            .map(|i| DedupRecord {
                hash: format!("h{}", i),
                ts: now - (29 - i),
            })
            .collect();
        ledger.seed("user1", &records).unwrap();

        // This append brings the count to the threshold: oldest 10 dropped
        ledger.append("user1", "h-new").await.unwrap();

        let valid = ledger.read_valid("user1").await.unwrap();
        assert_eq!(valid.len(), 20);
        assert!(valid.contains("h-new"));
        assert!(!valid.contains("h0"));
        assert!(!valid.contains("h9"));
        assert!(valid.contains("h10"));
    }

    #[tokio::test]
    async fn test_hard_cap_truncates() {
        let dir = tempdir().unwrap();
        let mut config = LedgerConfig::default();
        config.lock.settle_ms = 1;
        config.trim_threshold = 1_000; // never hit in this test
        config.trim_count = 10;
        config.hard_cap = 50;
        let ledger = DedupLedger::with_config(dir.path(), config);

        let now = now_ms();
        let records: Vec<DedupRecord> = (0..80)
            .map(|i| DedupRecord {
                hash: format!("h{}", i),
                ts: now - (80 - i),
            })
            .collect();
        ledger.seed("user1", &records).unwrap();

        ledger.append("user1", "h-new").await.unwrap();

        let valid = ledger.read_valid("user1").await.unwrap();
        assert_eq!(valid.len(), 50);
        assert!(valid.contains("h-new"));
        // Only the newest survive
        assert!(!valid.contains("h0"));
        assert!(valid.contains("h79"));
    }

    #[tokio::test]
    async fn test_identities_are_isolated() {
        let dir = tempdir().unwrap();
        let ledger = fast_ledger(dir.path());

        ledger.append("user1", &digest("mint1")).await.unwrap();

        let other = ledger.read_valid("user2").await.unwrap();
        assert!(other.is_empty());
    }
}
