//! Request middleware: resolve the tenant, obtain its pool, run the gate.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use tenancy_sdk::TenancyError;

use crate::domain::resolver::HostInfo;

use super::error::tenancy_error_response;
use super::{TenancyState, TenantContext};

/// Resolution inputs copied out of the request up front. The request body
/// is not `Sync`, so no borrow of the request may live across an await
/// point; everything the async steps need is owned here.
#[derive(Debug, Default)]
struct ResolutionInputs {
    host: Option<String>,
    forwarded_host: Option<String>,
    referer: Option<String>,
    explicit_slug: Option<String>,
}

impl ResolutionInputs {
    fn from_request(req: &Request) -> Self {
        let headers = req.headers();
        Self {
            host: header_string(headers, header::HOST.as_str()),
            forwarded_host: header_string(headers, "x-forwarded-host"),
            referer: header_string(headers, header::REFERER.as_str()),
            explicit_slug: query_param(req.uri().query(), "tenant"),
        }
    }

    fn hosts(&self) -> HostInfo<'_> {
        HostInfo {
            host: self.host.as_deref(),
            forwarded_host: self.forwarded_host.as_deref(),
            referer: self.referer.as_deref(),
        }
    }
}

/// Resolves the request to a tenant, attaches a ready-to-use pool handle
/// and runs the request gate, in the order: resolve -> pool -> gate.
///
/// On success the request carries a [`TenantContext`] extension; on failure
/// the mapped error response is returned and the inner service never runs.
pub async fn tenant_middleware(
    State(state): State<TenancyState>,
    mut req: Request,
    next: Next,
) -> Response {
    let inputs = ResolutionInputs::from_request(&req);
    match build_context(&state, &inputs).await {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(e) => tenancy_error_response(&e),
    }
}

async fn build_context(
    state: &TenancyState,
    inputs: &ResolutionInputs,
) -> Result<TenantContext, TenancyError> {
    let resolved = state
        .resolver
        .resolve(inputs.hosts(), inputs.explicit_slug.as_deref())
        .await?;
    let db = state.pools.get(resolved.tenant_id).await?;
    state
        .gate
        .check(Some(&resolved), inputs.host.as_deref().unwrap_or_default())
        .await?;

    Ok(TenantContext {
        tenant: resolved,
        db,
    })
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Pull one parameter out of the query string (administrative/API clients
/// address a tenant directly with `?tenant=<slug>`).
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
