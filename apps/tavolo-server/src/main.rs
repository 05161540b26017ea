mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::{Extension, Json, Router, middleware::from_fn_with_state};
use clap::{Parser, Subcommand};
use tavolo_db::{ConnectOpts, DbHandle};
use tenancy::api::rest::{TenancyState, TenantContext, handlers::admin_router, middleware::tenant_middleware};
use tenancy::domain::{RequestGate, TenantPoolManager, TenantProvisioner, TenantResolver};
use tenancy::infra::{SqlxTenantRegistry, StaticDirectory};

use crate::config::AppConfig;

/// Tavolo Server - multi-tenant restaurant menu backend
#[derive(Parser)]
#[command(name = "tavolo-server")]
#[command(about = "Tavolo Server - multi-tenant restaurant menu backend")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for the HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(ref path) = cli.config {
        if !path.is_file() {
            anyhow::bail!("config file does not exist: {}", path.to_string_lossy());
        }
    }

    init_logging(cli.verbose);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        let host = config
            .server
            .bind_addr
            .rsplit_once(':')
            .map_or("127.0.0.1", |(h, _)| h)
            .to_owned();
        config.server.bind_addr = format!("{host}:{port}");
    }

    if cli.print_config {
        println!("Effective configuration:\n{}", config.render()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => {
            println!("Configuration is valid");
            println!("{}", config.render()?);
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tavolo_server={default},tenancy={default},tavolo_db={default}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Diagnostic handler behind the tenant middleware; everything it needs is
/// already in the request extension.
async fn whoami(Extension(ctx): Extension<TenantContext>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "tenant_id": ctx.tenant.tenant_id,
        "slug": ctx.tenant.slug,
    }))
}

async fn health() -> &'static str {
    "ok"
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Tavolo Server starting");

    let tenancy_cfg = config.tenancy.clone();

    // Control database: the persisted tenant registry lives here.
    let control_dsn = tenancy_cfg.store.control_dsn();
    tracing::info!(
        dsn = tavolo_db::redact_credentials_in_dsn(Some(&control_dsn)),
        "connecting control database"
    );
    let control = DbHandle::connect(&control_dsn, ConnectOpts::default())
        .await
        .context("connecting control database")?;
    let registry = Arc::new(SqlxTenantRegistry::new(Arc::new(control)));
    registry.bootstrap().await?;

    let directory = Arc::new(StaticDirectory::from_config(&tenancy_cfg.directory));
    let state = TenancyState {
        resolver: Arc::new(TenantResolver::new(
            tenancy_cfg.resolver.clone(),
            directory.clone(),
        )),
        pools: Arc::new(TenantPoolManager::new(
            registry.clone(),
            ConnectOpts::default(),
        )),
        gate: Arc::new(RequestGate::new(&tenancy_cfg.gate, directory.clone())),
        provisioner: Arc::new(TenantProvisioner::new(
            tenancy_cfg.store.clone(),
            tenancy_cfg.namespace.clone(),
            registry,
            ConnectOpts::default(),
        )),
        directory,
    };

    // Keep the rate limiter's idle keys from accumulating.
    let sweeper = {
        let gate = Arc::clone(&state.gate);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(60));
            loop {
                tick.tick().await;
                gate.sweep();
            }
        })
    };

    let tenant_routes = Router::new()
        .route("/api/whoami", get(whoami))
        .layer(from_fn_with_state(state.clone(), tenant_middleware));

    let app = Router::new()
        .route("/health", get(health))
        .merge(admin_router(state.clone()))
        .merge(tenant_routes);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.server.bind_addr))?;
    tracing::info!(addr = %config.server.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweeper.abort();

    tracing::info!("draining tenant pools");
    state.pools.close_all().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
