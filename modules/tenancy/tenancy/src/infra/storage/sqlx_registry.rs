//! Tenant registry backed by the control database.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tavolo_db::DbHandle;
use tenancy_sdk::TenantDatabaseConfig;
use uuid::Uuid;

use crate::domain::registry::TenantRegistry;

const BOOTSTRAP_DDL: &str = "CREATE TABLE IF NOT EXISTS tenant_databases (
    tenant_id TEXT PRIMARY KEY,
    dsn TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

const UPSERT_SQL: &str = "INSERT INTO tenant_databases (tenant_id, dsn, created_at, updated_at)
    VALUES ($1, $2, $3, $3)
    ON CONFLICT (tenant_id) DO UPDATE SET dsn = excluded.dsn, updated_at = excluded.updated_at";

const FIND_SQL: &str = "SELECT tenant_id, dsn, created_at, updated_at
    FROM tenant_databases WHERE tenant_id = $1";

const REMOVE_SQL: &str = "DELETE FROM tenant_databases WHERE tenant_id = $1";

type Row = (String, String, String, String);

/// Registry persisted in the control database.
///
/// Timestamps are stored as RFC 3339 text so the same statements work on
/// both supported backends.
pub struct SqlxTenantRegistry {
    db: Arc<DbHandle>,
}

impl SqlxTenantRegistry {
    #[must_use]
    pub fn new(db: Arc<DbHandle>) -> Self {
        Self { db }
    }

    /// Create the registry table if absent. Run once at startup.
    ///
    /// # Errors
    /// Returns an error when the DDL fails.
    pub async fn bootstrap(&self) -> anyhow::Result<()> {
        self.db
            .execute(BOOTSTRAP_DDL)
            .await
            .context("bootstrapping tenant_databases table")?;
        Ok(())
    }

    fn decode(row: Row) -> anyhow::Result<TenantDatabaseConfig> {
        let (tenant_id, dsn, created_at, updated_at) = row;
        Ok(TenantDatabaseConfig {
            tenant_id: tenant_id.parse().context("invalid tenant_id in registry")?,
            dsn,
            created_at: parse_ts(&created_at)?,
            updated_at: parse_ts(&updated_at)?,
        })
    }
}

fn parse_ts(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .context("invalid timestamp in registry")?
        .with_timezone(&Utc))
}

#[async_trait]
impl TenantRegistry for SqlxTenantRegistry {
    async fn upsert(&self, tenant_id: Uuid, dsn: &str) -> anyhow::Result<()> {
        let id = tenant_id.to_string();
        let now = Utc::now().to_rfc3339();
        match self.db.engine() {
            #[cfg(feature = "pg")]
            tavolo_db::DbEngine::Postgres => {
                let pool = self
                    .db
                    .sqlx_postgres()
                    .context("control handle is not postgres")?;
                sqlx::query(UPSERT_SQL)
                    .bind(&id)
                    .bind(dsn)
                    .bind(&now)
                    .execute(pool)
                    .await?;
            }
            #[cfg(not(feature = "pg"))]
            tavolo_db::DbEngine::Postgres => anyhow::bail!("postgres backend not enabled"),
            #[cfg(feature = "sqlite")]
            tavolo_db::DbEngine::Sqlite => {
                let pool = self
                    .db
                    .sqlx_sqlite()
                    .context("control handle is not sqlite")?;
                sqlx::query(UPSERT_SQL)
                    .bind(&id)
                    .bind(dsn)
                    .bind(&now)
                    .execute(pool)
                    .await?;
            }
            #[cfg(not(feature = "sqlite"))]
            tavolo_db::DbEngine::Sqlite => anyhow::bail!("sqlite backend not enabled"),
        }
        Ok(())
    }

    async fn find(&self, tenant_id: Uuid) -> anyhow::Result<Option<TenantDatabaseConfig>> {
        let id = tenant_id.to_string();
        let row: Option<Row> = match self.db.engine() {
            #[cfg(feature = "pg")]
            tavolo_db::DbEngine::Postgres => {
                let pool = self
                    .db
                    .sqlx_postgres()
                    .context("control handle is not postgres")?;
                sqlx::query_as(FIND_SQL).bind(&id).fetch_optional(pool).await?
            }
            #[cfg(not(feature = "pg"))]
            tavolo_db::DbEngine::Postgres => anyhow::bail!("postgres backend not enabled"),
            #[cfg(feature = "sqlite")]
            tavolo_db::DbEngine::Sqlite => {
                let pool = self
                    .db
                    .sqlx_sqlite()
                    .context("control handle is not sqlite")?;
                sqlx::query_as(FIND_SQL).bind(&id).fetch_optional(pool).await?
            }
            #[cfg(not(feature = "sqlite"))]
            tavolo_db::DbEngine::Sqlite => anyhow::bail!("sqlite backend not enabled"),
        };
        row.map(Self::decode).transpose()
    }

    async fn remove(&self, tenant_id: Uuid) -> anyhow::Result<()> {
        let id = tenant_id.to_string();
        match self.db.engine() {
            #[cfg(feature = "pg")]
            tavolo_db::DbEngine::Postgres => {
                let pool = self
                    .db
                    .sqlx_postgres()
                    .context("control handle is not postgres")?;
                sqlx::query(REMOVE_SQL).bind(&id).execute(pool).await?;
            }
            #[cfg(not(feature = "pg"))]
            tavolo_db::DbEngine::Postgres => anyhow::bail!("postgres backend not enabled"),
            #[cfg(feature = "sqlite")]
            tavolo_db::DbEngine::Sqlite => {
                let pool = self
                    .db
                    .sqlx_sqlite()
                    .context("control handle is not sqlite")?;
                sqlx::query(REMOVE_SQL).bind(&id).execute(pool).await?;
            }
            #[cfg(not(feature = "sqlite"))]
            tavolo_db::DbEngine::Sqlite => anyhow::bail!("sqlite backend not enabled"),
        }
        Ok(())
    }
}
