pub mod directory;
pub mod storage;

pub use directory::StaticDirectory;
pub use storage::{InMemoryTenantRegistry, SqlxTenantRegistry};
