//! Process-local cache of live connection pools, keyed by tenant id.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tavolo_db::{ConnectOpts, DbHandle};
use tenancy_sdk::TenancyError;
use uuid::Uuid;

use crate::domain::registry::TenantRegistry;

/// How long `close_all` waits for a single pool to drain before moving on.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns every live tenant pool in this process.
///
/// Invariant: at most one pool instance exists per tenant id at any time.
/// Concurrent first access for the same tenant performs exactly one
/// construction; different tenants construct concurrently. A failed
/// construction keeps the per-tenant guard entry in place so every retry
/// serializes through the same lock; `evict` and `close_all` clean it up.
///
/// Constructed at process start and injectable into anything that needs
/// tenant-scoped database access; `close_all` runs at shutdown.
pub struct TenantPoolManager {
    pools: DashMap<Uuid, Arc<DbHandle>>,
    creating: DashMap<Uuid, Arc<tokio::sync::Mutex<()>>>,
    registry: Arc<dyn TenantRegistry>,
    opts: ConnectOpts,
}

impl TenantPoolManager {
    #[must_use]
    pub fn new(registry: Arc<dyn TenantRegistry>, opts: ConnectOpts) -> Self {
        Self {
            pools: DashMap::new(),
            creating: DashMap::new(),
            registry,
            opts,
        }
    }

    /// Get the tenant's pool, creating it on first access.
    ///
    /// A cache hit returns immediately with no I/O.
    ///
    /// # Errors
    /// - [`TenancyError::TenantUnconfigured`] when the registry has no entry
    /// - [`TenancyError::Database`] when pool construction fails
    pub async fn get(&self, tenant_id: Uuid) -> Result<Arc<DbHandle>, TenancyError> {
        if let Some(pool) = self.pools.get(&tenant_id) {
            return Ok(Arc::clone(&pool));
        }

        // Serialize creation per tenant id; other tenants proceed unblocked.
        let guard = self
            .creating
            .entry(tenant_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _locked = guard.lock().await;

        // A concurrent caller may have finished while we waited.
        if let Some(pool) = self.pools.get(&tenant_id) {
            return Ok(Arc::clone(&pool));
        }

        // The cache insert must happen before the guard entry goes away,
        // otherwise a late caller could start a second construction.
        match self.create_pool(tenant_id).await {
            Ok(pool) => {
                self.pools.insert(tenant_id, Arc::clone(&pool));
                self.creating.remove(&tenant_id);
                Ok(pool)
            }
            // The guard entry stays on failure: waiters already queued on
            // this mutex retry under it, and newcomers must contend on the
            // same mutex rather than minting a second one.
            Err(e) => Err(e),
        }
    }

    async fn create_pool(&self, tenant_id: Uuid) -> Result<Arc<DbHandle>, TenancyError> {
        let config = self
            .registry
            .find(tenant_id)
            .await?
            .ok_or(TenancyError::TenantUnconfigured { tenant_id })?;

        tracing::debug!(
            %tenant_id,
            dsn = tavolo_db::redact_credentials_in_dsn(Some(&config.dsn)),
            "creating tenant pool"
        );
        let handle = DbHandle::connect(&config.dsn, self.opts.clone()).await?;
        Ok(Arc::new(handle))
    }

    /// Close and remove one tenant's pool. Used after deprovisioning; a
    /// miss is a no-op.
    pub async fn evict(&self, tenant_id: Uuid) {
        self.creating.remove(&tenant_id);
        if let Some((_, pool)) = self.pools.remove(&tenant_id) {
            tracing::debug!(%tenant_id, "evicting tenant pool");
            pool.close().await;
        }
    }

    /// Drain every pool. Failures and timeouts are logged, never raised,
    /// so shutdown always completes.
    pub async fn close_all(&self) {
        self.creating.clear();
        let tenant_ids: Vec<Uuid> = self.pools.iter().map(|e| *e.key()).collect();
        for tenant_id in tenant_ids {
            if let Some((_, pool)) = self.pools.remove(&tenant_id) {
                if tokio::time::timeout(CLOSE_TIMEOUT, pool.close())
                    .await
                    .is_err()
                {
                    tracing::warn!(%tenant_id, "pool close timed out during shutdown");
                }
            }
        }
    }

    /// Number of live pools (diagnostics).
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
