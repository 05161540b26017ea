//! Persisted tenant-to-database mapping.

use async_trait::async_trait;
use tenancy_sdk::TenantDatabaseConfig;
use uuid::Uuid;

/// The registry is the only cross-process source of truth for where a
/// tenant's data lives. The pool manager's cache is an optimization over
/// it, never a replacement.
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// Insert or replace the connection descriptor for a tenant.
    async fn upsert(&self, tenant_id: Uuid, dsn: &str) -> anyhow::Result<()>;

    /// Look up a tenant's database config. `Ok(None)` when unconfigured.
    async fn find(&self, tenant_id: Uuid) -> anyhow::Result<Option<TenantDatabaseConfig>>;

    /// Remove a tenant's database config. Removing a missing entry is not
    /// an error.
    async fn remove(&self, tenant_id: Uuid) -> anyhow::Result<()>;
}
