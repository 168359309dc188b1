//! Best-effort removal of storage objects that a committed record no longer
//! references. Failures are retried, then logged and dropped: the database
//! row is the source of truth and a leftover object is only a leak.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use crate::assets::AssetNaming;
use crate::storage::{AssetStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(100) }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based), quadratic in the attempt number.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_mul(attempt))
    }
}

/// Outcome of one purge, keyed by storage key.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PurgeReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
    /// URLs from which no storage key could be recovered.
    pub unresolved: Vec<String>,
}

impl PurgeReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.unresolved.is_empty()
    }
}

#[derive(Clone)]
pub struct AssetCleaner {
    store: Arc<dyn AssetStore>,
    naming: AssetNaming,
    retry: RetryPolicy,
}

impl AssetCleaner {
    pub fn new(store: Arc<dyn AssetStore>, naming: AssetNaming, retry: RetryPolicy) -> Self {
        Self { store, naming, retry }
    }

    /// URLs in `before` whose storage key is not reachable from any URL in
    /// `after`. Comparison is by key, so a kept object survives a change of
    /// URL form (query string, escaping, legacy unprefixed path).
    pub fn dropped_assets<'a, I, J>(&self, before: I, after: J) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
        J: IntoIterator<Item = &'a String>,
    {
        let kept: BTreeSet<String> = after.into_iter().filter_map(|url| self.naming.resolve_key(url)).collect();
        before
            .into_iter()
            .filter(|url| match self.naming.resolve_key(url) {
                Some(key) => !kept.contains(&key),
                None => true,
            })
            .cloned()
            .collect()
    }

    /// Delete every object referenced by `urls`. Never fails; see the report.
    ///
    /// URLs resolving to the same key produce a single delete. Deletes are
    /// independent and run concurrently.
    pub async fn purge<I>(&self, urls: I) -> PurgeReport
    where
        I: IntoIterator<Item = String>,
    {
        let mut report = PurgeReport::default();
        let mut keys = BTreeSet::new();
        for url in urls {
            match self.naming.resolve_key(&url) {
                Some(key) => {
                    keys.insert(key);
                }
                None => {
                    warn!(url = %url, "could not derive storage key; object left in place");
                    report.unresolved.push(url);
                }
            }
        }
        if keys.is_empty() {
            return report;
        }

        let outcomes = join_all(keys.iter().map(|key| self.delete_with_retry(key))).await;
        for (key, outcome) in keys.into_iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.deleted.push(key),
                Err(_) => report.failed.push(key),
            }
        }
        if report.failed.is_empty() {
            info!(deleted = report.deleted.len(), "storage cleanup finished");
        } else {
            warn!(
                deleted = report.deleted.len(),
                failed = ?report.failed,
                "storage cleanup left orphaned objects"
            );
        }
        report
    }

    async fn delete_with_retry(&self, key: &str) -> Result<(), StoreError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.store.delete(key).await {
                Ok(()) => {
                    debug!(key, attempt, "deleted storage object");
                    return Ok(());
                }
                Err(e) if attempt >= self.retry.max_attempts => {
                    error!(key, attempt, error = %e, "giving up on storage delete");
                    return Err(e);
                }
                Err(e) => {
                    let backoff = self.retry.backoff(attempt);
                    warn!(key, attempt, error = %e, backoff_ms = backoff.as_millis() as u64, "storage delete failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_quadratic() {
        let p = RetryPolicy { max_attempts: 4, base_delay: Duration::from_millis(50) };
        assert_eq!(p.backoff(1), Duration::from_millis(50));
        assert_eq!(p.backoff(2), Duration::from_millis(200));
        assert_eq!(p.backoff(3), Duration::from_millis(450));
    }
}
