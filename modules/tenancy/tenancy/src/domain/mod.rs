pub mod domain_map;
pub mod gate;
pub mod namespace;
pub mod pool_manager;
pub mod provisioner;
pub mod registry;
pub mod resolver;

#[cfg(all(test, feature = "sqlite"))]
mod pool_manager_test;

pub use domain_map::DomainMap;
pub use gate::RequestGate;
pub use namespace::derive_namespace_name;
pub use pool_manager::TenantPoolManager;
pub use provisioner::TenantProvisioner;
pub use registry::TenantRegistry;
pub use resolver::{HostInfo, TenantResolver};
