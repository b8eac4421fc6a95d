//! # Organization Handlers
//!
//! Organizations are normally mirrored from the identity provider by the
//! webhook; the create endpoint covers manual provisioning.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};

use crate::auth::Session;
use crate::error::ApiError;
use crate::handlers::types::OrganizationResponse;
use crate::repositories::{OrganizationRepository, organization::OrganizationDraft};
use crate::server::AppState;

/// Create an organization
#[utoipa::path(
    post,
    path = "/api/organizations/create",
    security(("bearer_auth" = [])),
    request_body = OrganizationDraft,
    responses(
        (status = 201, description = "Organization created", body = OrganizationResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 409, description = "External id or slug already in use", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "organizations"
)]
pub async fn create_organization(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<OrganizationDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<OrganizationResponse>), ApiError> {
    let Json(draft) = payload?;
    let new = draft.validate()?;
    session.ensure_org_access(&new.external_id)?;

    let organization = OrganizationRepository::new(&state.db).create(new).await?;
    tracing::info!(
        organization_id = organization.id,
        slug = %organization.slug,
        "Organization created"
    );

    Ok((StatusCode::CREATED, Json(organization.into())))
}

/// List all live organizations
#[utoipa::path(
    get,
    path = "/api/organizations/list",
    responses(
        (status = 200, description = "Organizations in creation order", body = Vec<OrganizationResponse>),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "organizations"
)]
pub async fn list_organizations(
    State(state): State<AppState>,
) -> Result<Json<Vec<OrganizationResponse>>, ApiError> {
    let organizations = OrganizationRepository::new(&state.db).list().await?;
    Ok(Json(organizations.into_iter().map(Into::into).collect()))
}
