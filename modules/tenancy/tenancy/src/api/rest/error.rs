//! Mapping from tenancy errors to HTTP responses.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tenancy_sdk::TenancyError;

/// Map a tenancy error to its HTTP response.
///
/// Client-side resolution failures are 404s; gate rejections carry their
/// specific statuses; everything else is an opaque 500 with details only in
/// the logs.
pub fn tenancy_error_response(err: &TenancyError) -> Response {
    match err {
        TenancyError::TenantNotResolved => {
            body(StatusCode::NOT_FOUND, "tenant_not_resolved", "unknown host")
        }
        TenancyError::TenantNotFound { slug } => body(
            StatusCode::NOT_FOUND,
            "tenant_not_found",
            &format!("no tenant for slug '{slug}'"),
        ),
        TenancyError::RateLimited { retry_after } => {
            let mut response = body(
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "too many requests",
            );
            let secs = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
        TenancyError::SubscriptionInactive => body(
            StatusCode::FORBIDDEN,
            "subscription_inactive",
            "this restaurant is currently unavailable, please contact the tenant",
        ),
        TenancyError::TenantUnconfigured { tenant_id } => {
            tracing::error!(%tenant_id, "tenant has no database configuration");
            internal()
        }
        TenancyError::ProvisioningFailed(e) => {
            tracing::error!(error = ?e, "provisioning failed");
            body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "provisioning_failed",
                "tenant provisioning failed",
            )
        }
        TenancyError::Database(e) => {
            tracing::error!(error = ?e, "database error");
            internal()
        }
        TenancyError::Internal(e) => {
            tracing::error!(error = ?e, "internal error");
            internal()
        }
    }
}

fn internal() -> Response {
    body(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal",
        "internal server error",
    )
}

fn body(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            tenancy_error_response(&TenancyError::TenantNotResolved).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            tenancy_error_response(&TenancyError::SubscriptionInactive).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            tenancy_error_response(&TenancyError::TenantUnconfigured {
                tenant_id: uuid::Uuid::new_v4()
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rate_limited_carries_retry_after() {
        let response = tenancy_error_response(&TenancyError::RateLimited {
            retry_after: Duration::from_secs(17),
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            &HeaderValue::from_static("17")
        );
    }
}
