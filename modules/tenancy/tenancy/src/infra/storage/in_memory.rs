//! In-memory tenant registry for tests and mock mode.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tenancy_sdk::TenantDatabaseConfig;
use uuid::Uuid;

use crate::domain::registry::TenantRegistry;

#[derive(Default)]
pub struct InMemoryTenantRegistry {
    entries: Mutex<HashMap<Uuid, TenantDatabaseConfig>>,
}

impl InMemoryTenantRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries (tests).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl TenantRegistry for InMemoryTenantRegistry {
    async fn upsert(&self, tenant_id: Uuid, dsn: &str) -> anyhow::Result<()> {
        let now = Utc::now();
        let mut entries = self.entries.lock();
        entries
            .entry(tenant_id)
            .and_modify(|e| {
                e.dsn = dsn.to_owned();
                e.updated_at = now;
            })
            .or_insert_with(|| TenantDatabaseConfig {
                tenant_id,
                dsn: dsn.to_owned(),
                created_at: now,
                updated_at: now,
            });
        Ok(())
    }

    async fn find(&self, tenant_id: Uuid) -> anyhow::Result<Option<TenantDatabaseConfig>> {
        Ok(self.entries.lock().get(&tenant_id).cloned())
    }

    async fn remove(&self, tenant_id: Uuid) -> anyhow::Result<()> {
        self.entries.lock().remove(&tenant_id);
        Ok(())
    }
}
