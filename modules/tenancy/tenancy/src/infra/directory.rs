//! Config-backed tenant directory.
//!
//! Serves tenant records and subscription windows straight from
//! configuration. Useful for development, tests and single-box deployments;
//! production wires the business-layer directory behind the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tenancy_sdk::{SubscriptionStatus, SubscriptionWindow, Tenant, TenantDirectory};
use uuid::Uuid;

use crate::config::DirectoryConfig;

pub struct StaticDirectory {
    tenants: Vec<Tenant>,
    subscriptions: HashMap<Uuid, SubscriptionWindow>,
}

impl StaticDirectory {
    #[must_use]
    pub fn from_config(cfg: &DirectoryConfig) -> Self {
        let now = Utc::now();
        let mut tenants = Vec::with_capacity(cfg.tenants.len());
        let mut subscriptions = HashMap::new();

        for entry in &cfg.tenants {
            tenants.push(Tenant {
                id: entry.id,
                slug: entry.slug.clone(),
                name: entry.name.clone(),
                created_at: now,
            });
            if let Some(sub) = &entry.subscription {
                subscriptions.insert(
                    entry.id,
                    SubscriptionWindow {
                        tenant_id: entry.id,
                        status: sub.status,
                        start_date: sub.start_date,
                        end_date: sub.end_date,
                    },
                );
            }
        }

        Self {
            tenants,
            subscriptions,
        }
    }

    /// Directory with every tenant on an open-ended active subscription.
    /// Convenience for tests.
    #[must_use]
    pub fn with_active_tenants(tenants: Vec<Tenant>) -> Self {
        let subscriptions = tenants
            .iter()
            .map(|t| {
                (
                    t.id,
                    SubscriptionWindow {
                        tenant_id: t.id,
                        status: SubscriptionStatus::Active,
                        start_date: None,
                        end_date: None,
                    },
                )
            })
            .collect();
        Self {
            tenants,
            subscriptions,
        }
    }
}

#[async_trait]
impl TenantDirectory for StaticDirectory {
    async fn find_by_slug(&self, slug: &str) -> anyhow::Result<Option<Tenant>> {
        Ok(self.tenants.iter().find(|t| t.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Tenant>> {
        Ok(self.tenants.iter().find(|t| t.id == id).cloned())
    }

    async fn subscription(&self, tenant_id: Uuid) -> anyhow::Result<Option<SubscriptionWindow>> {
        Ok(self.subscriptions.get(&tenant_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SubscriptionEntry, TenantEntry};

    #[tokio::test]
    async fn serves_tenants_and_subscriptions_from_config() {
        let id = Uuid::new_v4();
        let cfg = DirectoryConfig {
            tenants: vec![TenantEntry {
                id,
                slug: "pasta".to_owned(),
                name: "Pasta House".to_owned(),
                subscription: Some(SubscriptionEntry::default()),
            }],
        };
        let dir = StaticDirectory::from_config(&cfg);

        let tenant = dir.find_by_slug("pasta").await.unwrap().unwrap();
        assert_eq!(tenant.id, id);
        assert!(dir.find_by_slug("ghost").await.unwrap().is_none());
        assert_eq!(dir.find_by_id(id).await.unwrap().unwrap().slug, "pasta");

        let sub = dir.subscription(id).await.unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn tenant_without_subscription_entry_has_none() {
        let id = Uuid::new_v4();
        let cfg = DirectoryConfig {
            tenants: vec![TenantEntry {
                id,
                slug: "pasta".to_owned(),
                name: "Pasta House".to_owned(),
                subscription: None,
            }],
        };
        let dir = StaticDirectory::from_config(&cfg);
        assert!(dir.subscription(id).await.unwrap().is_none());
    }
}
