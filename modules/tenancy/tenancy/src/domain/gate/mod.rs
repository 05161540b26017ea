//! Per-tenant checks that run in front of business logic.

pub mod rate_limit;
pub mod subscription;

use std::sync::Arc;

use tenancy_sdk::{ResolvedTenant, TenancyError, TenantDirectory};

pub use rate_limit::RateLimiter;
pub use subscription::SubscriptionGate;

use crate::config::GateConfig;

/// Rate limiting and subscription validity, composed in front of business
/// handlers. Both are keyed by resolved tenant id, falling back to the host
/// string when no tenant is available.
pub struct RequestGate {
    limiter: RateLimiter,
    subscription: SubscriptionGate,
}

impl RequestGate {
    #[must_use]
    pub fn new(cfg: &GateConfig, directory: Arc<dyn TenantDirectory>) -> Self {
        Self {
            limiter: RateLimiter::new(cfg.window, cfg.max_requests),
            subscription: SubscriptionGate::new(directory),
        }
    }

    /// Run both checks for one request.
    ///
    /// # Errors
    /// - [`TenancyError::RateLimited`] when the key exceeded its window cap
    /// - [`TenancyError::SubscriptionInactive`] when the resolved tenant has
    ///   no active subscription window
    pub async fn check(
        &self,
        resolved: Option<&ResolvedTenant>,
        host: &str,
    ) -> Result<(), TenancyError> {
        let key = resolved.map_or_else(|| host.to_owned(), |r| r.tenant_id.to_string());
        self.limiter.check(&key)?;

        if let Some(resolved) = resolved {
            self.subscription.check(resolved.tenant_id).await?;
        }
        Ok(())
    }

    /// Drop rate-limiter keys with no traffic inside the current window.
    pub fn sweep(&self) {
        self.limiter.sweep();
    }
}
