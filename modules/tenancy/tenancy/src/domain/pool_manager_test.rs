use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tavolo_db::ConnectOpts;
use tenancy_sdk::{TenancyError, TenantDatabaseConfig};
use uuid::Uuid;

use super::pool_manager::TenantPoolManager;
use super::registry::TenantRegistry;

/// Registry stub that counts lookups; one lookup per construction sequence.
struct CountingRegistry {
    dsn: Mutex<Option<String>>,
    find_calls: AtomicUsize,
}

impl CountingRegistry {
    fn with_dsn(dsn: &str) -> Self {
        Self {
            dsn: Mutex::new(Some(dsn.to_owned())),
            find_calls: AtomicUsize::new(0),
        }
    }

    fn empty() -> Self {
        Self {
            dsn: Mutex::new(None),
            find_calls: AtomicUsize::new(0),
        }
    }

    fn set_dsn(&self, dsn: &str) {
        *self.dsn.lock() = Some(dsn.to_owned());
    }
}

#[async_trait]
impl TenantRegistry for CountingRegistry {
    async fn upsert(&self, _tenant_id: Uuid, _dsn: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn find(&self, tenant_id: Uuid) -> anyhow::Result<Option<TenantDatabaseConfig>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.dsn.lock().clone().map(|dsn| TenantDatabaseConfig {
            tenant_id,
            dsn,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }))
    }

    async fn remove(&self, _tenant_id: Uuid) -> anyhow::Result<()> {
        *self.dsn.lock() = None;
        Ok(())
    }
}

#[tokio::test]
async fn sequential_gets_return_the_same_pool_instance() {
    let registry = Arc::new(CountingRegistry::with_dsn("sqlite::memory:"));
    let manager = TenantPoolManager::new(registry.clone(), ConnectOpts::default());
    let tenant_id = Uuid::new_v4();

    let first = manager.get(tenant_id).await.unwrap();
    let second = manager.get(tenant_id).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.find_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_first_access_constructs_exactly_once() {
    let registry = Arc::new(CountingRegistry::with_dsn("sqlite::memory:"));
    let manager = Arc::new(TenantPoolManager::new(
        registry.clone(),
        ConnectOpts::default(),
    ));
    let tenant_id = Uuid::new_v4();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.get(tenant_id).await })
        })
        .collect();

    let mut pools = Vec::new();
    for task in tasks {
        pools.push(task.await.unwrap().unwrap());
    }

    assert_eq!(registry.find_calls.load(Ordering::SeqCst), 1);
    for pool in &pools[1..] {
        assert!(Arc::ptr_eq(&pools[0], pool));
    }
    assert_eq!(manager.len(), 1);
}

#[tokio::test]
async fn different_tenants_get_different_pools() {
    let registry = Arc::new(CountingRegistry::with_dsn("sqlite::memory:"));
    let manager = TenantPoolManager::new(registry, ConnectOpts::default());

    let a = manager.get(Uuid::new_v4()).await.unwrap();
    let b = manager.get(Uuid::new_v4()).await.unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(manager.len(), 2);
}

#[tokio::test]
async fn missing_registry_entry_is_unconfigured() {
    let registry = Arc::new(CountingRegistry::empty());
    let manager = TenantPoolManager::new(registry, ConnectOpts::default());
    let tenant_id = Uuid::new_v4();

    let err = manager.get(tenant_id).await.unwrap_err();
    assert!(matches!(
        err,
        TenancyError::TenantUnconfigured { tenant_id: id } if id == tenant_id
    ));
}

#[tokio::test]
async fn failed_construction_is_retried_on_next_access() {
    let registry = Arc::new(CountingRegistry::with_dsn("unknown://nope"));
    let manager = TenantPoolManager::new(registry.clone(), ConnectOpts::default());
    let tenant_id = Uuid::new_v4();

    assert!(manager.get(tenant_id).await.is_err());
    assert!(manager.is_empty());

    registry.set_dsn("sqlite::memory:");
    let pool = manager.get(tenant_id).await;
    assert!(pool.is_ok());
    assert_eq!(registry.find_calls.load(Ordering::SeqCst), 2);
}

/// Registry whose first lookup fails slowly and later lookups succeed
/// slowly, exposing any overlap between construction sequences.
struct FlakyRegistry {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FlakyRegistry {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TenantRegistry for FlakyRegistry {
    async fn upsert(&self, _tenant_id: Uuid, _dsn: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn find(&self, tenant_id: Uuid) -> anyhow::Result<Option<TenantDatabaseConfig>> {
        let concurrent = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(concurrent, Ordering::SeqCst);
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        let result = if call == 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(anyhow::anyhow!("store unavailable"))
        } else {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(Some(TenantDatabaseConfig {
                tenant_id,
                dsn: "sqlite::memory:".to_owned(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn remove(&self, _tenant_id: Uuid) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn waiters_and_newcomers_share_one_construction_after_a_failure() {
    // Three staggered callers: the first one's construction fails mid-way,
    // the second is already queued on the guard when it does, and the third
    // arrives only after the failure. No two construction sequences may
    // ever overlap, and the survivors must share one pool.
    let registry = Arc::new(FlakyRegistry::new());
    let manager = Arc::new(TenantPoolManager::new(
        registry.clone(),
        ConnectOpts::default(),
    ));
    let tenant_id = Uuid::new_v4();

    let tasks: Vec<_> = [0u64, 10, 80]
        .into_iter()
        .map(|delay_ms| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                manager.get(tenant_id).await
            })
        })
        .collect();

    let mut pools = Vec::new();
    let mut failures = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(pool) => pools.push(pool),
            Err(_) => failures += 1,
        }
    }

    assert_eq!(registry.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(failures, 1);
    assert_eq!(pools.len(), 2);
    assert!(Arc::ptr_eq(&pools[0], &pools[1]));
    assert_eq!(manager.len(), 1);
}

#[tokio::test]
async fn evict_closes_and_next_get_rebuilds() {
    let registry = Arc::new(CountingRegistry::with_dsn("sqlite::memory:"));
    let manager = TenantPoolManager::new(registry, ConnectOpts::default());
    let tenant_id = Uuid::new_v4();

    let first = manager.get(tenant_id).await.unwrap();
    manager.evict(tenant_id).await;
    assert!(manager.is_empty());

    let second = manager.get(tenant_id).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn close_all_drains_every_pool() {
    let registry = Arc::new(CountingRegistry::with_dsn("sqlite::memory:"));
    let manager = TenantPoolManager::new(registry, ConnectOpts::default());

    for _ in 0..3 {
        manager.get(Uuid::new_v4()).await.unwrap();
    }
    assert_eq!(manager.len(), 3);

    manager.close_all().await;
    assert!(manager.is_empty());
}
