//! Per-(match, debate type) generation locks.
//!
//! Two requests generating the same debate at once would otherwise both
//! call the generator and race on the insert. The store's uniqueness rule
//! still catches a race across processes; this only keeps one process from
//! paying for the same generation twice.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::info;

use super::model::DebateType;

type LockKey = (i64, DebateType);

#[derive(Clone, Default)]
pub struct GenerationLocks {
    inner: Arc<RwLock<HashMap<LockKey, Arc<Mutex<()>>>>>,
}

impl GenerationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, key: LockKey) -> Arc<Mutex<()>> {
        {
            let locks = self.inner.read().await;
            if let Some(lock) = locks.get(&key) {
                return lock.clone();
            }
        }

        // Re-check under the write lock; another task may have inserted.
        let mut locks = self.inner.write().await;
        locks.entry(key).or_default().clone()
    }

    /// Wait for exclusive use of the pair. Released when the guard drops.
    pub async fn acquire(&self, match_id: i64, debate_type: DebateType) -> OwnedMutexGuard<()> {
        self.slot((match_id, debate_type)).await.lock_owned().await
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Forget idle locks once the table grows past `max_size`. A lock that is
    /// held or awaited has other references and is kept.
    pub async fn cleanup(&self, max_size: usize) {
        let mut locks = self.inner.write().await;
        if locks.len() > max_size {
            let before = locks.len();
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            info!(
                "Pruned generation locks: {} -> {} (limit {})",
                before,
                locks.len(),
                max_size
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_pair_is_serialized() {
        let locks = GenerationLocks::new();
        let guard = locks.acquire(7, DebateType::PreMatch).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(7, DebateType::PreMatch).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_pairs_do_not_block() {
        let locks = GenerationLocks::new();
        let _pre = locks.acquire(7, DebateType::PreMatch).await;
        let post = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(7, DebateType::PostMatch),
        )
        .await;
        assert!(post.is_ok());
        assert_eq!(locks.len().await, 2);
    }

    #[tokio::test]
    async fn cleanup_keeps_held_locks() {
        let locks = GenerationLocks::new();
        let _held = locks.acquire(1, DebateType::PreMatch).await;
        drop(locks.acquire(2, DebateType::PreMatch).await);
        drop(locks.acquire(3, DebateType::PreMatch).await);

        locks.cleanup(10).await;
        assert_eq!(locks.len().await, 3);

        locks.cleanup(1).await;
        assert_eq!(locks.len().await, 1);
    }
}
