//! Error taxonomy for the tenancy module.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by tenant resolution, pooling, provisioning and gating.
#[derive(Debug, Error)]
pub enum TenancyError {
    /// No tenant slug could be derived from the request (client error).
    #[error("no tenant could be resolved from the request")]
    TenantNotResolved,

    /// A slug was derived but no such tenant exists (client error).
    #[error("tenant not found: {slug}")]
    TenantNotFound {
        /// The slug that did not match any tenant.
        slug: String,
    },

    /// The tenant exists but has no database config yet (server
    /// misconfiguration).
    #[error("tenant has no database configuration: {tenant_id}")]
    TenantUnconfigured { tenant_id: Uuid },

    /// Provisioning failed before the registry commit point.
    #[error("provisioning failed: {0}")]
    ProvisioningFailed(#[source] anyhow::Error),

    /// Soft, retryable rate-limit rejection.
    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Hard deny: the tenant has no active subscription.
    #[error("tenant subscription is not active")]
    SubscriptionInactive,

    /// Unexpected storage error during request-time pool use.
    #[error(transparent)]
    Database(#[from] tavolo_db::DbError),

    /// Any other unexpected failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
