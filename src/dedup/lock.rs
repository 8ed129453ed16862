//! Advisory Ledger Lock
//!
//! Cross-process mutual exclusion for one identity's ledger file, implemented
//! as a marker file whose payload is the acquisition timestamp in epoch
//! milliseconds. A marker older than the staleness window is treated as
//! crash-orphaned and reclaimed by the next acquirer. This is best-effort
//! single-host exclusion, not a distributed lock; the staleness window is a
//! liveness/correctness trade-off, tunable via [`LockConfig`].
//!
//! Waiting is bounded: rather than polling forever on a marker that keeps
//! being refreshed, [`acquire`] gives up with [`LockError::Timeout`] after
//! `wait_timeout_ms` (a generous multiple of the staleness window, so a
//! crash-orphaned marker is always reclaimed long before the bound hits).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use super::now_ms;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Failed to create lock marker: {0}")]
    CreateFailed(String),

    #[error("Lock wait timed out after {0}ms")]
    Timeout(u64),
}

/// Tunables for the advisory lock
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Age past which a held marker is considered crash-orphaned
    pub stale_ms: i64,
    /// Poll interval while waiting on a held marker
    pub poll_ms: u64,
    /// Settle delay after creating the marker, before proceeding
    pub settle_ms: u64,
    /// Upper bound on total wait; generous multiple of the staleness window
    pub wait_timeout_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            stale_ms: 2_000,
            poll_ms: 20,
            settle_ms: 25,
            wait_timeout_ms: 10_000,
        }
    }
}

/// Held advisory lock; the marker is removed on drop
#[derive(Debug)]
pub struct LockGuard {
    marker: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Release unconditionally removes the marker if present
        if let Err(e) = fs::remove_file(&self.marker) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove lock marker {}: {}", self.marker.display(), e);
            }
        }
    }
}

/// Acquire the advisory lock for `marker`, waiting out contention and
/// reclaiming stale markers.
pub async fn acquire(marker: &Path, config: &LockConfig) -> Result<LockGuard, LockError> {
    let started = now_ms();

    loop {
        match try_create(marker) {
            Ok(true) => {
                tokio::time::sleep(Duration::from_millis(config.settle_ms)).await;
                return Ok(LockGuard {
                    marker: marker.to_path_buf(),
                });
            }
            Ok(false) => {
                if marker_is_stale(marker, config.stale_ms) {
                    tracing::debug!(
                        "Reclaiming stale lock marker {}",
                        marker.display()
                    );
                    let _ = fs::remove_file(marker);
                    continue;
                }
            }
            Err(e) => return Err(e),
        }

        if now_ms().saturating_sub(started) as u64 >= config.wait_timeout_ms {
            return Err(LockError::Timeout(config.wait_timeout_ms));
        }
        tokio::time::sleep(Duration::from_millis(config.poll_ms)).await;
    }
}

/// Atomically create the marker; Ok(false) means another holder beat us
fn try_create(marker: &Path) -> Result<bool, LockError> {
    if let Some(parent) = marker.parent() {
        fs::create_dir_all(parent).map_err(|e| LockError::CreateFailed(e.to_string()))?;
    }

    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(marker)
    {
        Ok(mut file) => {
            use std::io::Write;
            if let Err(e) = write!(file, "{}", now_ms()) {
                let _ = fs::remove_file(marker);
                return Err(LockError::CreateFailed(e.to_string()));
            }
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(LockError::CreateFailed(e.to_string())),
    }
}

/// A marker with an unreadable or ancient timestamp counts as stale
fn marker_is_stale(marker: &Path, stale_ms: i64) -> bool {
    match fs::read_to_string(marker) {
        Ok(content) => match content.trim().parse::<i64>() {
            Ok(ts) => now_ms() - ts > stale_ms,
            Err(_) => true,
        },
        // Racing holder may have released between our create attempt and here
        Err(e) => e.kind() != std::io::ErrorKind::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn fast_config() -> LockConfig {
        LockConfig {
            stale_ms: 2_000,
            poll_ms: 5,
            settle_ms: 1,
            wait_timeout_ms: 500,
        }
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("user1.lock");

        let guard = acquire(&marker, &fast_config()).await.unwrap();
        assert!(marker.exists());

        drop(guard);
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_contention_times_out() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("user1.lock");

        let _held = acquire(&marker, &fast_config()).await.unwrap();

        let result = acquire(&marker, &fast_config()).await;
        assert!(matches!(result, Err(LockError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_stale_marker_reclaimed() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("user1.lock");

        // Simulate a crash-orphaned marker from 5 seconds ago
        let mut file = fs::File::create(&marker).unwrap();
        write!(file, "{}", now_ms() - 5_000).unwrap();

        let guard = acquire(&marker, &fast_config()).await.unwrap();
        assert!(marker.exists());
        drop(guard);
    }

    #[tokio::test]
    async fn test_garbage_marker_reclaimed() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("user1.lock");
        fs::write(&marker, "not a timestamp").unwrap();

        let guard = acquire(&marker, &fast_config()).await;
        assert!(guard.is_ok());
    }

    #[tokio::test]
    async fn test_fresh_marker_blocks() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("user1.lock");

        let mut file = fs::File::create(&marker).unwrap();
        write!(file, "{}", now_ms()).unwrap();

        let result = acquire(&marker, &fast_config()).await;
        assert!(matches!(result, Err(LockError::Timeout(_))));
    }
}
