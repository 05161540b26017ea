//! Administrative tenant lifecycle endpoints.
//!
//! Provisioning and deprovisioning are long-running (namespace DDL) and run
//! only here, outside the hot request path.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tenancy_sdk::{DeprovisionOutcome, Tenant};
use uuid::Uuid;

use super::TenancyState;
use super::error::tenancy_error_response;

pub fn admin_router(state: TenancyState) -> Router {
    Router::new()
        .route("/admin/tenants", post(create_tenant))
        .route("/admin/tenants/{slug}", delete(delete_tenant))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateTenantResponse {
    pub tenant: Tenant,
    pub namespace: String,
    /// Descriptor with the password masked; the full one lives only in the
    /// registry.
    pub dsn: String,
}

/// Provision a new tenant database.
///
/// The database is provisioned before any tenant record becomes visible:
/// the business layer persists the tenant row only after this call
/// succeeds, so a provisioning failure leaves nothing behind to clean up.
async fn create_tenant(
    State(state): State<TenancyState>,
    Json(body): Json<CreateTenantRequest>,
) -> Response {
    let slug = body.slug.trim();
    if slug.is_empty() || body.name.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "error": "validation",
                "message": "slug and name must be non-empty",
            })),
        )
            .into_response();
    }

    let tenant = Tenant {
        id: Uuid::new_v4(),
        slug: slug.to_owned(),
        name: body.name.trim().to_owned(),
        created_at: Utc::now(),
    };

    match state.provisioner.provision(&tenant).await {
        Ok(dsn) => {
            let namespace = state.provisioner.namespace_name(&tenant.slug);
            let response = CreateTenantResponse {
                tenant,
                namespace,
                dsn: tavolo_db::redact_credentials_in_dsn(Some(&dsn)),
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => tenancy_error_response(&e),
    }
}

/// Tear down a tenant's database, best-effort, and evict its pool.
///
/// Always answers 200 for a known tenant: deprovisioning never blocks the
/// broader delete-tenant workflow, even when the store is unreachable. The
/// outcome reports what could not be cleaned up.
async fn delete_tenant(State(state): State<TenancyState>, Path(slug): Path<String>) -> Response {
    let tenant = match state.directory.find_by_slug(&slug).await {
        Ok(Some(tenant)) => tenant,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "error": "tenant_not_found",
                    "message": format!("no tenant for slug '{slug}'"),
                })),
            )
                .into_response();
        }
        Err(e) => return tenancy_error_response(&e.into()),
    };

    let outcome: DeprovisionOutcome = state.provisioner.deprovision(&tenant).await;
    state.pools.evict(tenant.id).await;

    (StatusCode::OK, Json(outcome)).into_response()
}
