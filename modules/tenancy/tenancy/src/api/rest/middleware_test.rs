use std::sync::Arc;
use std::time::Duration;

use axum::http::{Request, StatusCode, header};
use axum::routing::get;
use axum::{Extension, Json, Router, body::Body, middleware::from_fn_with_state};
use chrono::{NaiveDate, Utc};
use tavolo_db::ConnectOpts;
use tenancy_sdk::{Tenant, TenantDirectory};
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::{
    DirectoryConfig, GateConfig, NamespaceConfig, ResolverConfig, StoreConfig, StoreEngine,
    SubscriptionEntry, TenantEntry,
};
use crate::domain::{RequestGate, TenantPoolManager, TenantProvisioner, TenantResolver};
use crate::infra::{InMemoryTenantRegistry, StaticDirectory};

use super::middleware::tenant_middleware;
use super::{TenancyState, TenantContext};

async fn whoami(Extension(ctx): Extension<TenantContext>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "slug": ctx.tenant.slug }))
}

struct Fixture {
    router: Router,
    _data_dir: tempfile::TempDir,
}

async fn fixture(directory: Arc<dyn TenantDirectory>, gate_cfg: GateConfig) -> Fixture {
    let data_dir = tempfile::tempdir().unwrap();
    let store = StoreConfig {
        engine: StoreEngine::Sqlite,
        data_dir: data_dir.path().to_path_buf(),
        ..StoreConfig::default()
    };
    let registry = Arc::new(InMemoryTenantRegistry::new());
    let provisioner = Arc::new(TenantProvisioner::new(
        store,
        NamespaceConfig::default(),
        registry.clone(),
        ConnectOpts::default(),
    ));

    // Provision every tenant the directory knows about.
    for slug in ["pasta", "sushi", "expired"] {
        if let Some(tenant) = directory.find_by_slug(slug).await.unwrap() {
            provisioner.provision(&tenant).await.unwrap();
        }
    }

    let resolver_cfg = ResolverConfig {
        root_domain: Some("example.com".to_owned()),
        ..ResolverConfig::default()
    };
    let state = TenancyState {
        resolver: Arc::new(TenantResolver::new(resolver_cfg, directory.clone())),
        pools: Arc::new(TenantPoolManager::new(registry, ConnectOpts::default())),
        gate: Arc::new(RequestGate::new(&gate_cfg, directory.clone())),
        provisioner,
        directory,
    };

    let router = Router::new()
        .route("/menu", get(whoami))
        .layer(from_fn_with_state(state, tenant_middleware));

    Fixture {
        router,
        _data_dir: data_dir,
    }
}

fn tenant(slug: &str) -> Tenant {
    Tenant {
        id: Uuid::new_v4(),
        slug: slug.to_owned(),
        name: slug.to_owned(),
        created_at: Utc::now(),
    }
}

fn active_directory() -> Arc<dyn TenantDirectory> {
    Arc::new(StaticDirectory::with_active_tenants(vec![
        tenant("pasta"),
        tenant("sushi"),
    ]))
}

async fn send(router: &Router, host: &str) -> axum::response::Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/menu")
                .header(header::HOST, host)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn gated_request_carries_tenant_context() {
    let f = fixture(active_directory(), GateConfig::default()).await;
    let response = send(&f.router, "pasta.example.com").await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["slug"], "pasta");
}

#[tokio::test]
async fn gated_request_is_servable_from_a_spawned_task() {
    // The middleware future must be Send: the server runs it on a
    // multi-threaded runtime, so no borrow of the request body may be held
    // across an await.
    let f = fixture(active_directory(), GateConfig::default()).await;
    let router = f.router.clone();

    let response = tokio::spawn(async move {
        router
            .oneshot(
                Request::builder()
                    .uri("/menu")
                    .header(header::HOST, "pasta.example.com")
                    .header(header::REFERER, "https://pasta.example.com/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    })
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unresolvable_host_is_not_found() {
    let f = fixture(active_directory(), GateConfig::default()).await;
    let response = send(&f.router, "api.othersite.net").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_slug_is_not_found() {
    let f = fixture(active_directory(), GateConfig::default()).await;
    let response = send(&f.router, "ghost.example.com").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn over_cap_requests_are_rate_limited() {
    let gate_cfg = GateConfig {
        window: Duration::from_secs(60),
        max_requests: 2,
    };
    let f = fixture(active_directory(), gate_cfg).await;

    assert_eq!(send(&f.router, "pasta.example.com").await.status(), StatusCode::OK);
    assert_eq!(send(&f.router, "pasta.example.com").await.status(), StatusCode::OK);

    let third = send(&f.router, "pasta.example.com").await;
    assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(third.headers().contains_key(header::RETRY_AFTER));

    // Another tenant is keyed independently.
    assert_eq!(send(&f.router, "sushi.example.com").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn expired_subscription_is_forbidden() {
    let expired = TenantEntry {
        id: Uuid::new_v4(),
        slug: "expired".to_owned(),
        name: "Expired".to_owned(),
        subscription: Some(SubscriptionEntry {
            end_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            ..SubscriptionEntry::default()
        }),
    };
    let directory: Arc<dyn TenantDirectory> = Arc::new(StaticDirectory::from_config(
        &DirectoryConfig {
            tenants: vec![expired],
        },
    ));
    let f = fixture(directory, GateConfig::default()).await;

    let response = send(&f.router, "expired.example.com").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unprovisioned_tenant_is_a_server_error() {
    // Directory knows the tenant but nothing was provisioned.
    let directory: Arc<dyn TenantDirectory> =
        Arc::new(StaticDirectory::with_active_tenants(vec![tenant("lonely")]));
    let data_dir = tempfile::tempdir().unwrap();
    let store = StoreConfig {
        engine: StoreEngine::Sqlite,
        data_dir: data_dir.path().to_path_buf(),
        ..StoreConfig::default()
    };
    let registry = Arc::new(InMemoryTenantRegistry::new());
    let resolver_cfg = ResolverConfig {
        root_domain: Some("example.com".to_owned()),
        ..ResolverConfig::default()
    };
    let state = TenancyState {
        resolver: Arc::new(TenantResolver::new(resolver_cfg, directory.clone())),
        pools: Arc::new(TenantPoolManager::new(registry.clone(), ConnectOpts::default())),
        gate: Arc::new(RequestGate::new(&GateConfig::default(), directory.clone())),
        provisioner: Arc::new(TenantProvisioner::new(
            store,
            NamespaceConfig::default(),
            registry,
            ConnectOpts::default(),
        )),
        directory,
    };
    let router = Router::new()
        .route("/menu", get(whoami))
        .layer(from_fn_with_state(state, tenant_middleware));

    let response = send(&router, "lonely.example.com").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
