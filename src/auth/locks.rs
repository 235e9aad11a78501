use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-tenant async locks. Holding a tenant's guard serializes token
/// refreshes for that tenant without blocking any other tenant.
#[derive(Clone, Default)]
pub struct TenantLocks {
    inner: Arc<StdMutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl TenantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `tenant_id`, creating it on first use. The
    /// registry mutex is only held long enough to clone the entry; the
    /// await happens outside it.
    pub async fn acquire(&self, tenant_id: i64) -> OwnedMutexGuard<()> {
        let entry = {
            let mut registry = self
                .inner
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            Arc::clone(registry.entry(tenant_id).or_default())
        };
        entry.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_tenant_is_serialized() {
        let locks = TenantLocks::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(7).await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_tenants_do_not_block_each_other() {
        let locks = TenantLocks::new();
        let _held = locks.acquire(1).await;

        let other = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2)).await;
        assert!(other.is_ok());
    }
}
