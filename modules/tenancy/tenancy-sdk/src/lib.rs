//! Tenancy SDK
//!
//! This crate provides the public surface of the `tenancy` module:
//!
//! - [`TenantDirectory`] - Collaborator trait for tenant and subscription lookups
//! - [`Tenant`], [`TenantDatabaseConfig`], [`SubscriptionWindow`] - Domain models
//! - [`TenancyError`] - Error taxonomy shared by resolver, pool manager,
//!   provisioner and request gate
//!
//! The business layer owns tenant records and subscriptions; the tenancy core
//! only consumes them through [`TenantDirectory`].

pub mod api;
pub mod error;
pub mod models;

pub use api::TenantDirectory;
pub use error::TenancyError;
pub use models::{
    DeprovisionOutcome, ResolvedTenant, SubscriptionStatus, SubscriptionWindow, Tenant,
    TenantDatabaseConfig,
};
