//! # Incident Handlers
//!
//! Mutations name both the organization and the service; an incident that
//! exists under a different service is reported as not found.

use axum::{
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
};

use crate::auth::Session;
use crate::cascade::CascadeCoordinator;
use crate::error::ApiError;
use crate::handlers::resolve_tenant;
use crate::handlers::types::{
    IncidentResponse, MessageResponse, ServiceScopedQuery, require_path_id,
};
use crate::repositories::{
    IncidentRepository,
    incident::{IncidentDraft, IncidentPatch},
};
use crate::server::AppState;

/// Open an incident against a service
#[utoipa::path(
    post,
    path = "/api/incidents/create",
    security(("bearer_auth" = [])),
    request_body = IncidentDraft,
    responses(
        (status = 201, description = "Incident created", body = IncidentResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization or service not found", body = ApiError)
    ),
    tag = "incidents"
)]
pub async fn create_incident(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<IncidentDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<IncidentResponse>), ApiError> {
    let Json(draft) = payload?;
    let new = draft.validate()?;
    let organization_id = resolve_tenant(&state, &session, &new.organization_id).await?;

    let incident = IncidentRepository::new(&state.db)
        .create(organization_id, new)
        .await?;
    tracing::info!(
        organization_id,
        service_id = incident.service_id,
        incident_id = incident.id,
        "Incident created"
    );

    Ok((StatusCode::CREATED, Json(incident.into())))
}

/// List incidents of an organization, optionally for one service
#[utoipa::path(
    get,
    path = "/api/incidents/list",
    security(("bearer_auth" = [])),
    params(ServiceScopedQuery),
    responses(
        (status = 200, description = "Live incidents in creation order", body = Vec<IncidentResponse>),
        (status = 400, description = "organization_id missing", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization not found", body = ApiError)
    ),
    tag = "incidents"
)]
pub async fn list_incidents(
    State(state): State<AppState>,
    session: Session,
    query: Result<Query<ServiceScopedQuery>, QueryRejection>,
) -> Result<Json<Vec<IncidentResponse>>, ApiError> {
    let Query(query) = query?;
    let (external_id, service_id) = query.require_organization()?;
    let organization_id = resolve_tenant(&state, &session, &external_id).await?;

    let incidents = IncidentRepository::new(&state.db)
        .list(organization_id, service_id)
        .await?;
    Ok(Json(incidents.into_iter().map(Into::into).collect()))
}

/// Partially update an incident
#[utoipa::path(
    put,
    path = "/api/incidents/update/{id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Incident id"),
        ServiceScopedQuery
    ),
    request_body = IncidentPatch,
    responses(
        (status = 200, description = "Incident updated", body = IncidentResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization or incident not found", body = ApiError)
    ),
    tag = "incidents"
)]
pub async fn update_incident(
    State(state): State<AppState>,
    session: Session,
    path: Result<Path<i32>, PathRejection>,
    query: Result<Query<ServiceScopedQuery>, QueryRejection>,
    payload: Result<Json<IncidentPatch>, JsonRejection>,
) -> Result<Json<IncidentResponse>, ApiError> {
    let Path(incident_id) = path?;
    let Query(query) = query?;
    let Json(patch) = payload?;
    let incident_id = require_path_id("id", incident_id)?;
    let (external_id, service_id) = query.require_both()?;
    let changes = patch.validate()?;
    let organization_id = resolve_tenant(&state, &session, &external_id).await?;

    let incident = IncidentRepository::new(&state.db)
        .update(organization_id, service_id, incident_id, changes)
        .await?;
    Ok(Json(incident.into()))
}

/// Delete an incident and its updates
#[utoipa::path(
    delete,
    path = "/api/incidents/delete/{id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Incident id"),
        ServiceScopedQuery
    ),
    responses(
        (status = 200, description = "Incident deleted", body = MessageResponse),
        (status = 400, description = "organization_id or service_id missing", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization or incident not found", body = ApiError),
        (status = 500, description = "Transaction failed and was rolled back", body = ApiError)
    ),
    tag = "incidents"
)]
pub async fn delete_incident(
    State(state): State<AppState>,
    session: Session,
    path: Result<Path<i32>, PathRejection>,
    query: Result<Query<ServiceScopedQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(incident_id) = path?;
    let Query(query) = query?;
    let incident_id = require_path_id("id", incident_id)?;
    let (external_id, service_id) = query.require_both()?;
    let organization_id = resolve_tenant(&state, &session, &external_id).await?;

    CascadeCoordinator::new(&state.db)
        .delete_incident(organization_id, service_id, incident_id)
        .await?;

    Ok(Json(MessageResponse::new("Incident deleted successfully")))
}
