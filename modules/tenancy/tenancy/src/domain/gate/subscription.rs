//! Subscription validity check.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tenancy_sdk::{TenancyError, TenantDirectory};
use uuid::Uuid;

/// Fails closed when a tenant has no active subscription window.
///
/// Deliberately uncached: the lookup runs on every request so an
/// administrative suspension takes effect immediately.
pub struct SubscriptionGate {
    directory: Arc<dyn TenantDirectory>,
}

impl SubscriptionGate {
    #[must_use]
    pub fn new(directory: Arc<dyn TenantDirectory>) -> Self {
        Self { directory }
    }

    /// # Errors
    /// Returns [`TenancyError::SubscriptionInactive`] when the tenant has
    /// no subscription or an expired/suspended one.
    pub async fn check(&self, tenant_id: Uuid) -> Result<(), TenancyError> {
        self.check_on(tenant_id, Utc::now().date_naive()).await
    }

    /// Same as [`Self::check`] with an explicit "today" for tests.
    ///
    /// # Errors
    /// See [`Self::check`].
    pub async fn check_on(&self, tenant_id: Uuid, today: NaiveDate) -> Result<(), TenancyError> {
        let window = self.directory.subscription(tenant_id).await?;
        match window {
            Some(w) if w.is_active_on(today) => Ok(()),
            _ => Err(TenancyError::SubscriptionInactive),
        }
    }
}
