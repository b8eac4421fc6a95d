//! # API Handlers
//!
//! HTTP endpoint handlers for the status page API.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Session;
use crate::db;
use crate::error::{ApiError, not_found};
use crate::models::ServiceInfo;
use crate::repositories::{MemberRepository, OrganizationRepository};
use crate::server::AppState;

pub mod incident_updates;
pub mod incidents;
pub mod maintenances;
pub mod members;
pub mod organizations;
pub mod services;
pub mod status;
pub mod types;
pub mod webhooks;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Health probe body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

/// Liveness probe; never touches the database
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Process is alive", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe; succeeds only when the database answers
#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Database reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "health"
)]
pub async fn readyz(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    db::health_check(&state.db).await.map_err(|err| {
        tracing::warn!(error = %err, "Readiness check failed");
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Database service unavailable",
        )
    })?;

    Ok(Json(HealthResponse {
        status: "ready".to_string(),
    }))
}

/// Checks the session may address `external_id` and resolves it to the
/// internal organization id.
///
/// A session without an organization claim must belong to the organization
/// through a live membership. Every refusal reads as an unknown organization.
pub(crate) async fn resolve_tenant(
    state: &AppState,
    session: &Session,
    external_id: &str,
) -> Result<i32, ApiError> {
    session.ensure_org_access(external_id)?;
    let organization_id = OrganizationRepository::new(&state.db)
        .resolve_external(external_id)
        .await?;

    if let Some(user_id) = session.unscoped_user() {
        let is_member = MemberRepository::new(&state.db)
            .is_member(organization_id, user_id)
            .await?;
        if !is_member {
            tracing::warn!(
                user_id,
                requested_org = external_id,
                "Session user is not a member of the requested organization"
            );
            return Err(not_found("Organization not found"));
        }
    }

    Ok(organization_id)
}

#[cfg(test)]
mod tests;
