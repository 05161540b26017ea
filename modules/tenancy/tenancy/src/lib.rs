//! Tenancy Module
//!
//! Maps an inbound request to a tenant, hands out a pooled connection to
//! that tenant's isolated database, provisions the database when a tenant
//! is created and tears it down when the tenant is deleted.
//!
//! Request flow: host header / explicit slug -> [`domain::TenantResolver`] ->
//! [`domain::TenantPoolManager::get`] -> [`domain::RequestGate`] -> business
//! handlers (which receive a ready [`api::rest::TenantContext`] and must not
//! do their own resolution or pooling).
//!
//! The public API is defined in `tenancy-sdk` and re-exported here.

pub use tenancy_sdk::{
    DeprovisionOutcome, ResolvedTenant, SubscriptionStatus, SubscriptionWindow, TenancyError,
    Tenant, TenantDatabaseConfig, TenantDirectory,
};

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;
