//! Database abstraction for Tavolo.
//!
//! Provides a unified handle over the supported backends (`PostgreSQL` for
//! production, `SQLite` for development and tests) through `SQLx`. The handle
//! keeps the pool together with the engine and the DSN it was built from, so
//! callers can close it explicitly and log where it points without leaking
//! credentials.
//!
//! # Features
//! - `pg`, `sqlite`: enable the corresponding `SQLx` backends

#![cfg_attr(
    not(any(feature = "pg", feature = "sqlite")),
    allow(unused_imports, unused_variables, dead_code, unreachable_code)
)]

mod pool_opts;

use std::time::Duration;

use thiserror::Error;

#[cfg(any(feature = "pg", feature = "sqlite"))]
use pool_opts::ApplyPoolOpts;

#[cfg(feature = "pg")]
use sqlx::{PgPool, postgres::PgPoolOptions};
#[cfg(feature = "sqlite")]
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for the DB handle and helpers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error("Invalid connection parameter: {0}")]
    InvalidParameter(String),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[cfg(any(feature = "pg", feature = "sqlite"))]
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    Sqlite,
}

/// Connection options.
/// Covers the common sqlx pool knobs; each driver applies the subset it supports.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections in the pool.
    pub min_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    pub acquire_timeout: Option<Duration>,
    /// Idle timeout before a connection is closed.
    pub idle_timeout: Option<Duration>,
    /// Maximum lifetime for a connection.
    pub max_lifetime: Option<Duration>,
    /// Test connection health before acquire.
    pub test_before_acquire: bool,
    /// For `SQLite` file DSNs, create the file and parent directories if missing.
    pub create_sqlite_files: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            max_lifetime: None,
            test_before_acquire: false,
            create_sqlite_files: true,
        }
    }
}

/// One concrete sqlx pool.
#[derive(Clone, Debug)]
pub enum DbPool {
    #[cfg(feature = "pg")]
    Postgres(PgPool),
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
}

/// Main handle: one pool to one database, plus where it points.
#[derive(Debug, Clone)]
pub struct DbHandle {
    engine: DbEngine,
    pool: DbPool,
    dsn: String,
}

impl DbHandle {
    /// Detect engine by DSN.
    ///
    /// Note: only scheme prefixes are checked; the tail (credentials etc.)
    /// is never touched.
    ///
    /// # Errors
    /// Returns `DbError::UnknownDsn` if the DSN scheme is not recognized.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        // Trim only leading spaces/newlines to be forgiving with env files.
        let s = dsn.trim_start();

        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("sqlite:") || s.starts_with("sqlite://") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(redact_credentials_in_dsn(Some(dsn))))
        }
    }

    /// Connect and build handle.
    ///
    /// # Errors
    /// Returns an error if the connection fails or the DSN is invalid.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;
        match engine {
            #[cfg(feature = "pg")]
            DbEngine::Postgres => {
                let o = PgPoolOptions::new().apply(&opts);
                let pool = o.connect(dsn).await?;
                Ok(Self {
                    engine,
                    pool: DbPool::Postgres(pool),
                    dsn: dsn.to_owned(),
                })
            }
            #[cfg(not(feature = "pg"))]
            DbEngine::Postgres => Err(DbError::FeatureDisabled("PostgreSQL feature not enabled")),
            #[cfg(feature = "sqlite")]
            DbEngine::Sqlite => {
                use std::str::FromStr;

                if opts.create_sqlite_files {
                    prepare_sqlite_parent_dirs(dsn)?;
                }

                let conn = SqliteConnectOptions::from_str(dsn)?
                    .create_if_missing(opts.create_sqlite_files);
                let o = SqlitePoolOptions::new().apply(&opts);
                let pool = o.connect_with(conn).await?;
                Ok(Self {
                    engine,
                    pool: DbPool::Sqlite(pool),
                    dsn: dsn.to_owned(),
                })
            }
            #[cfg(not(feature = "sqlite"))]
            DbEngine::Sqlite => Err(DbError::FeatureDisabled("SQLite feature not enabled")),
        }
    }

    /// Graceful pool close. (Dropping the pool also closes it; this just makes it explicit.)
    pub async fn close(&self) {
        match &self.pool {
            #[cfg(feature = "pg")]
            DbPool::Postgres(p) => p.close().await,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => p.close().await,
        }
    }

    /// Get the backend.
    #[must_use]
    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// Get the DSN used for this connection.
    #[must_use]
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    // --- sqlx accessors ---
    #[cfg(feature = "pg")]
    #[must_use]
    pub fn sqlx_postgres(&self) -> Option<&PgPool> {
        match self.pool {
            DbPool::Postgres(ref p) => Some(p),
            #[cfg(feature = "sqlite")]
            _ => None,
        }
    }

    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlx_sqlite(&self) -> Option<&SqlitePool> {
        match self.pool {
            DbPool::Sqlite(ref p) => Some(p),
            #[cfg(feature = "pg")]
            _ => None,
        }
    }

    /// Run a statement without caring which backend the handle wraps.
    ///
    /// Used for DDL (schema bootstrap, namespace creation) where the SQL is
    /// already dialect-appropriate and no rows come back.
    ///
    /// # Errors
    /// Returns the underlying sqlx error.
    pub async fn execute(&self, sql: &str) -> Result<()> {
        match &self.pool {
            #[cfg(feature = "pg")]
            DbPool::Postgres(p) => {
                sqlx::query(sql).execute(p).await?;
            }
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => {
                sqlx::query(sql).execute(p).await?;
            }
        }
        Ok(())
    }
}

/// For `sqlite:path/to/file.db` style DSNs, make sure the parent directory
/// exists so the connect does not fail on a fresh data dir.
#[cfg(feature = "sqlite")]
fn prepare_sqlite_parent_dirs(dsn: &str) -> Result<()> {
    let path = dsn
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    if path.is_empty() || path.starts_with(':') {
        // in-memory forms (":memory:")
        return Ok(());
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Redact the password portion of a DSN for logging.
#[must_use]
pub fn redact_credentials_in_dsn(dsn: Option<&str>) -> String {
    match dsn {
        Some(dsn) if dsn.contains('@') => {
            if let Ok(mut parsed) = url::Url::parse(dsn) {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("***"));
                }
                parsed.to_string()
            } else {
                "***".to_owned()
            }
        }
        Some(dsn) => dsn.to_owned(),
        None => "none".to_owned(),
    }
}

// ===================== tests =====================
