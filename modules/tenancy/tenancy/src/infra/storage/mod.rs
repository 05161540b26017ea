pub mod in_memory;
pub mod sqlx_registry;

pub use in_memory::InMemoryTenantRegistry;
pub use sqlx_registry::SqlxTenantRegistry;
