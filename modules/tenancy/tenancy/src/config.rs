//! Configuration for the tenancy module.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tenancy_sdk::SubscriptionStatus;
use uuid::Uuid;

/// Module configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TenancyConfig {
    /// Host-to-slug resolution settings.
    pub resolver: ResolverConfig,

    /// Administrative store reached with admin credentials.
    pub store: StoreConfig,

    /// Tenant namespace naming.
    pub namespace: NamespaceConfig,

    /// Rate limiting and subscription gating.
    pub gate: GateConfig,

    /// Static tenant directory used in development and tests.
    /// Production deployments wire the business-layer directory instead.
    pub directory: DirectoryConfig,
}

/// Tenant identity resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Root domain for subdomain-based tenancy (`pasta.example.com` -> `pasta`).
    /// When unset, only the development suffix, custom domains and explicit
    /// slugs resolve.
    pub root_domain: Option<String>,

    /// Local-loopback convention for development hosts
    /// (`pasta.localhost` -> `pasta`).
    pub dev_suffix: String,

    /// Exact custom domain to tenant slug mapping, read-only at request time.
    pub custom_domains: HashMap<String, String>,

    /// Fallback slug for local development when nothing else matches.
    pub default_slug: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            root_domain: None,
            dev_suffix: "localhost".to_owned(),
            custom_domains: HashMap::new(),
            default_slug: None,
        }
    }
}

/// Which store backend the provisioner and registry talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreEngine {
    Postgres,
    #[default]
    Sqlite,
}

/// Administrative store settings.
///
/// These credentials are distinct from any tenant's own credentials: they are
/// allowed to create and drop namespaces, and they back the control database
/// that holds the tenant registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub engine: StoreEngine,

    /// Postgres host/port/credentials.
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,

    /// Maintenance database used for `CREATE DATABASE` statements.
    pub maintenance_db: String,

    /// Name of the control database holding the tenant registry.
    pub control_db: String,

    /// Directory for sqlite namespace files.
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            engine: StoreEngine::Sqlite,
            host: "localhost".to_owned(),
            port: 5432,
            user: "postgres".to_owned(),
            password: String::new(),
            maintenance_db: "postgres".to_owned(),
            control_db: "tavolo_control".to_owned(),
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StoreConfig {
    /// DSN of the maintenance database (postgres) or an in-memory database
    /// (sqlite); used only for namespace create/drop statements.
    #[must_use]
    pub fn admin_dsn(&self) -> String {
        match self.engine {
            StoreEngine::Postgres => self.postgres_dsn(&self.maintenance_db),
            StoreEngine::Sqlite => "sqlite::memory:".to_owned(),
        }
    }

    /// DSN of the control database holding the tenant registry.
    #[must_use]
    pub fn control_dsn(&self) -> String {
        match self.engine {
            StoreEngine::Postgres => self.postgres_dsn(&self.control_db),
            StoreEngine::Sqlite => self.sqlite_dsn(&self.control_db),
        }
    }

    /// Connection descriptor for a tenant namespace.
    #[must_use]
    pub fn namespace_dsn(&self, namespace: &str) -> String {
        match self.engine {
            StoreEngine::Postgres => self.postgres_dsn(namespace),
            StoreEngine::Sqlite => self.sqlite_dsn(namespace),
        }
    }

    fn postgres_dsn(&self, dbname: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, dbname
        )
    }

    fn sqlite_dsn(&self, name: &str) -> String {
        format!("sqlite://{}", self.data_dir.join(format!("{name}.db")).display())
    }
}

/// Tenant namespace naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamespaceConfig {
    /// Fixed prefix prepended to every derived namespace name.
    pub prefix: String,

    /// The store's maximum identifier length (63 for Postgres).
    pub max_identifier_len: usize,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            prefix: "menu_tenant_".to_owned(),
            max_identifier_len: 63,
        }
    }
}

/// Request gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Rate-limit window.
    #[serde(with = "humantime_serde")]
    pub window: Duration,

    /// Maximum requests per key within the window.
    pub max_requests: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 120,
        }
    }
}

/// Static tenant definitions for the config-backed directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectoryConfig {
    pub tenants: Vec<TenantEntry>,
}

/// One statically configured tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantEntry {
    pub id: Uuid,
    pub slug: String,
    pub name: String,

    /// Current subscription window. Absent means the gate denies access.
    #[serde(default)]
    pub subscription: Option<SubscriptionEntry>,
}

/// Subscription window for a statically configured tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubscriptionEntry {
    pub status: SubscriptionStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for SubscriptionEntry {
    fn default() -> Self {
        Self {
            status: SubscriptionStatus::Active,
            start_date: None,
            end_date: None,
        }
    }
}
