//! Per-project exclusive lease.
//!
//! Two concurrent deployments of the same project must not both compute the
//! "next" color from the same starting state. The lease is taken before
//! entering DEPLOYING and held until the new routing state is persisted;
//! dropping the guard (on any terminal transition) releases it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct ProjectLeases {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ProjectLeases {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, project_id: &str) -> OwnedMutexGuard<()> {
        let lease = {
            let mut map = self.inner.lock().unwrap();
            map.entry(project_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lease.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_project_serializes() {
        let leases = Arc::new(ProjectLeases::new());
        let in_critical = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let leases = leases.clone();
            let in_critical = in_critical.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = leases.acquire("p1").await;
                let now = in_critical.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_critical.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_projects_do_not_block_each_other() {
        let leases = ProjectLeases::new();
        let _a = leases.acquire("p1").await;
        // Must not deadlock while p1 is held.
        let _b = leases.acquire("p2").await;
    }
}
