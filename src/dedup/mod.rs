//! Dedup Layer - TTL-and-capacity-bounded store of seen token digests
//!
//! Suppresses duplicate notifications/processing of the same token for the
//! same user within a rolling 24h window. Each identity owns one ledger
//! segment on disk, guarded by an advisory marker-file lock with
//! staleness-based crash recovery.

pub mod gate;
pub mod ledger;
pub mod lock;

pub use gate::NotificationGate;
pub use ledger::{digest, DedupLedger, DedupRecord, LedgerConfig, LedgerError};
pub use lock::{LockConfig, LockError};

/// Wall-clock epoch milliseconds, the timestamp base for records and locks
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
