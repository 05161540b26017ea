//! Collaborator trait consumed by the tenancy core.
//!
//! Tenant records and subscriptions are owned by the business layer; the
//! tenancy core only ever reads them through this trait. The shipped
//! implementations are a config-backed static directory (development,
//! tests) and whatever the business layer registers in production.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{SubscriptionWindow, Tenant};

/// Read-only tenant and subscription lookups.
///
/// Subscription lookups are deliberately uncached by all callers: the gate
/// must reflect the latest state on every request.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Look up a tenant by its slug. `Ok(None)` when no such tenant exists.
    async fn find_by_slug(&self, slug: &str) -> anyhow::Result<Option<Tenant>>;

    /// Look up a tenant by its id. `Ok(None)` when no such tenant exists.
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Tenant>>;

    /// The tenant's current subscription window, if any.
    async fn subscription(&self, tenant_id: Uuid) -> anyhow::Result<Option<SubscriptionWindow>>;
}
