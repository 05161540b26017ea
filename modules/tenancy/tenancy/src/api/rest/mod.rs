//! HTTP surface of the tenancy module.
//!
//! Business handlers run behind [`middleware::tenant_middleware`], which
//! hands them a ready [`TenantContext`]; they must not attempt their own
//! tenant resolution or pooling.

pub mod error;
pub mod handlers;
pub mod middleware;

#[cfg(all(test, feature = "sqlite"))]
mod middleware_test;

use std::sync::Arc;

use tavolo_db::DbHandle;
use tenancy_sdk::{ResolvedTenant, TenantDirectory};

use crate::domain::{RequestGate, TenantPoolManager, TenantProvisioner, TenantResolver};

/// Everything the HTTP layer needs, wired once at startup.
#[derive(Clone)]
pub struct TenancyState {
    pub resolver: Arc<TenantResolver>,
    pub pools: Arc<TenantPoolManager>,
    pub gate: Arc<RequestGate>,
    pub provisioner: Arc<TenantProvisioner>,
    pub directory: Arc<dyn TenantDirectory>,
}

/// What a gated request carries into business handlers: the resolved tenant
/// and a live pool to its database.
#[derive(Clone)]
pub struct TenantContext {
    pub tenant: ResolvedTenant,
    pub db: Arc<DbHandle>,
}
