//! Named process-wide locks
//!
//! Serializes attach/detach critical sections that share a name. The iSCSI
//! driver locks `"connect_volume"` around every session mutation so
//! concurrent iscsiadm invocations cannot race on the node record store.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of named async mutexes
#[derive(Default)]
pub struct NamedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl NamedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `name`, creating it on first use.
    ///
    /// The lock is held until the returned guard is dropped.
    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(name.to_string()).or_default().clone();
        mutex.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_name_serializes() {
        let locks = Arc::new(NamedLocks::new());
        let in_section = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let in_section = in_section.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("connect_volume").await;
                let entered = in_section.fetch_add(1, Ordering::SeqCst);
                assert_eq!(entered, 0, "another task was inside the section");
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_section.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_distinct_names_are_independent() {
        let locks = NamedLocks::new();
        let guard_a = locks.lock("a").await;
        // Must not block on a different name while "a" is held
        let guard_b = tokio::time::timeout(Duration::from_millis(100), locks.lock("b"))
            .await
            .expect("lock on distinct name blocked");
        drop(guard_a);
        drop(guard_b);
    }
}
