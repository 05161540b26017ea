//! Tenant database provisioning and teardown.
//!
//! Provisioning runs with administrative credentials, outside the hot
//! request path: it is triggered by an administrative action, never by
//! ordinary tenant traffic. Every step before the registry write is
//! idempotent, so a failed provisioning is safe to retry; the registry
//! upsert is the commit point.

use std::sync::Arc;

use anyhow::Context;
use tavolo_db::{ConnectOpts, DbHandle};
use tenancy_sdk::{DeprovisionOutcome, TenancyError, Tenant};

use crate::config::{NamespaceConfig, StoreConfig, StoreEngine};
use crate::domain::namespace::derive_namespace_name;
use crate::domain::registry::TenantRegistry;

/// Minimal schema required by tenant-facing business logic.
const BOOTSTRAP_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS categories (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        position INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS menu_items (
        id TEXT PRIMARY KEY,
        category_id TEXT NOT NULL REFERENCES categories(id),
        name TEXT NOT NULL,
        description TEXT,
        price_cents INTEGER NOT NULL DEFAULT 0,
        image_url TEXT,
        available BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
];

/// Creates and destroys isolated tenant databases.
pub struct TenantProvisioner {
    store: StoreConfig,
    namespace: NamespaceConfig,
    registry: Arc<dyn TenantRegistry>,
    opts: ConnectOpts,
}

impl TenantProvisioner {
    #[must_use]
    pub fn new(
        store: StoreConfig,
        namespace: NamespaceConfig,
        registry: Arc<dyn TenantRegistry>,
        opts: ConnectOpts,
    ) -> Self {
        Self {
            store,
            namespace,
            registry,
            opts,
        }
    }

    /// The namespace name this provisioner derives for a slug.
    #[must_use]
    pub fn namespace_name(&self, slug: &str) -> String {
        derive_namespace_name(slug, &self.namespace.prefix, self.namespace.max_identifier_len)
    }

    /// Create the tenant's isolated database, bootstrap its schema and
    /// commit the connection descriptor to the registry.
    ///
    /// Idempotent: provisioning the same slug twice lands on the same
    /// namespace and leaves exactly one registry entry.
    ///
    /// # Errors
    /// Returns [`TenancyError::ProvisioningFailed`] when any step fails.
    /// The registry entry is only written after all preceding steps
    /// succeed, so a failure never leaves a partially-registered tenant.
    pub async fn provision(&self, tenant: &Tenant) -> Result<String, TenancyError> {
        let ns = self.namespace_name(&tenant.slug);
        tracing::info!(tenant_id = %tenant.id, slug = %tenant.slug, namespace = %ns, "provisioning tenant database");

        self.create_namespace(&ns)
            .await
            .with_context(|| format!("creating namespace {ns}"))
            .map_err(TenancyError::ProvisioningFailed)?;

        let dsn = self.store.namespace_dsn(&ns);
        self.bootstrap_schema(&dsn)
            .await
            .with_context(|| format!("bootstrapping schema in {ns}"))
            .map_err(TenancyError::ProvisioningFailed)?;

        // Commit point.
        self.registry
            .upsert(tenant.id, &dsn)
            .await
            .context("registering tenant database config")
            .map_err(TenancyError::ProvisioningFailed)?;

        Ok(dsn)
    }

    /// Best-effort teardown: drop the namespace and remove the registry
    /// entry.
    ///
    /// Never fails the caller; a tenant record must stay removable even
    /// when the underlying store cannot be reached. Everything that went
    /// wrong is reported in the outcome and logged as warnings.
    pub async fn deprovision(&self, tenant: &Tenant) -> DeprovisionOutcome {
        let mut warnings = Vec::new();

        // Prefer the namespace recorded in the registry; recompute from the
        // slug when it is missing (derivation is deterministic).
        let ns = match self.registry.find(tenant.id).await {
            Ok(Some(config)) => namespace_from_dsn(&config.dsn)
                .unwrap_or_else(|| self.namespace_name(&tenant.slug)),
            Ok(None) => self.namespace_name(&tenant.slug),
            Err(e) => {
                warnings.push(format!("registry lookup failed: {e:#}"));
                self.namespace_name(&tenant.slug)
            }
        };

        if let Err(e) = self.drop_namespace(&ns).await {
            warnings.push(format!("dropping namespace {ns} failed: {e:#}"));
        }

        if let Err(e) = self.registry.remove(tenant.id).await {
            warnings.push(format!("removing registry entry failed: {e:#}"));
        }

        for warning in &warnings {
            tracing::warn!(tenant_id = %tenant.id, slug = %tenant.slug, "deprovision: {warning}");
        }

        DeprovisionOutcome {
            ok: warnings.is_empty(),
            warnings,
        }
    }

    /// Create the namespace if it does not already exist (idempotent).
    async fn create_namespace(&self, ns: &str) -> anyhow::Result<()> {
        match self.store.engine {
            #[cfg(feature = "pg")]
            StoreEngine::Postgres => self.create_pg_database(ns).await,
            #[cfg(not(feature = "pg"))]
            StoreEngine::Postgres => anyhow::bail!("postgres backend not enabled"),
            StoreEngine::Sqlite => {
                // The database file itself appears on first connect.
                std::fs::create_dir_all(&self.store.data_dir).with_context(|| {
                    format!("creating {} for {ns}", self.store.data_dir.display())
                })?;
                Ok(())
            }
        }
    }

    async fn drop_namespace(&self, ns: &str) -> anyhow::Result<()> {
        match self.store.engine {
            #[cfg(feature = "pg")]
            StoreEngine::Postgres => self.drop_pg_database(ns).await,
            #[cfg(not(feature = "pg"))]
            StoreEngine::Postgres => anyhow::bail!("postgres backend not enabled"),
            StoreEngine::Sqlite => {
                let path = self.store.data_dir.join(format!("{ns}.db"));
                match std::fs::remove_file(&path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
                }
            }
        }
    }

    async fn bootstrap_schema(&self, dsn: &str) -> anyhow::Result<()> {
        let db = DbHandle::connect(dsn, self.opts.clone()).await?;
        for statement in BOOTSTRAP_SCHEMA {
            db.execute(statement).await?;
        }
        db.close().await;
        Ok(())
    }

    #[cfg(feature = "pg")]
    async fn create_pg_database(&self, ns: &str) -> anyhow::Result<()> {
        let admin = DbHandle::connect(&self.store.admin_dsn(), self.opts.clone()).await?;
        let pool = admin
            .sqlx_postgres()
            .context("admin handle is not postgres")?;
        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM pg_database WHERE datname = $1")
            .bind(ns)
            .fetch_optional(pool)
            .await?;
        if exists.is_none() {
            // `ns` comes from derive_namespace_name, alphabet [a-z0-9_],
            // so quoting it as an identifier is safe.
            admin.execute(&format!("CREATE DATABASE \"{ns}\"")).await?;
        }
        admin.close().await;
        Ok(())
    }

    #[cfg(feature = "pg")]
    async fn drop_pg_database(&self, ns: &str) -> anyhow::Result<()> {
        let admin = DbHandle::connect(&self.store.admin_dsn(), self.opts.clone()).await?;
        admin
            .execute(&format!("DROP DATABASE IF EXISTS \"{ns}\""))
            .await?;
        admin.close().await;
        Ok(())
    }
}

/// Parse the namespace name back out of a stored connection descriptor.
fn namespace_from_dsn(dsn: &str) -> Option<String> {
    if let Some(rest) = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
    {
        return std::path::Path::new(rest)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned());
    }
    let url = url::Url::parse(dsn).ok()?;
    let name = url.path().trim_start_matches('/');
    if name.is_empty() {
        None
    } else {
        Some(name.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_from_postgres_dsn() {
        assert_eq!(
            namespace_from_dsn("postgres://admin:pw@db:5432/menu_tenant_pasta_house").as_deref(),
            Some("menu_tenant_pasta_house")
        );
        assert_eq!(namespace_from_dsn("postgres://admin:pw@db:5432/"), None);
    }

    #[test]
    fn namespace_from_sqlite_dsn() {
        assert_eq!(
            namespace_from_dsn("sqlite://./data/menu_tenant_pasta_house.db").as_deref(),
            Some("menu_tenant_pasta_house")
        );
    }
}
