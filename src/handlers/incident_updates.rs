//! # Incident Update Handlers

use axum::{
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
};

use crate::auth::Session;
use crate::error::ApiError;
use crate::handlers::resolve_tenant;
use crate::handlers::types::{IncidentUpdateResponse, MessageResponse, TenantQuery, require_path_id};
use crate::repositories::{IncidentUpdateRepository, incident_update::IncidentUpdateDraft};
use crate::server::AppState;

/// Append an update to an incident's timeline
#[utoipa::path(
    post,
    path = "/api/incidents/{id}/updates",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Incident id")),
    request_body = IncidentUpdateDraft,
    responses(
        (status = 201, description = "Update recorded", body = IncidentUpdateResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization or incident not found", body = ApiError)
    ),
    tag = "incidents"
)]
pub async fn create_incident_update(
    State(state): State<AppState>,
    session: Session,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<IncidentUpdateDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<IncidentUpdateResponse>), ApiError> {
    let Path(incident_id) = path?;
    let Json(draft) = payload?;
    let incident_id = require_path_id("id", incident_id)?;
    let new = draft.validate()?;
    let organization_id = resolve_tenant(&state, &session, &new.organization_id).await?;

    let update = IncidentUpdateRepository::new(&state.db)
        .create(organization_id, incident_id, new.message)
        .await?;
    tracing::info!(organization_id, incident_id, update_id = update.id, "Incident update posted");

    Ok((StatusCode::CREATED, Json(update.into())))
}

/// List an incident's updates in the order they were posted
#[utoipa::path(
    get,
    path = "/api/incidents/{id}/updates",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Incident id"),
        TenantQuery
    ),
    responses(
        (status = 200, description = "Live updates, oldest first", body = Vec<IncidentUpdateResponse>),
        (status = 400, description = "organization_id missing", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization or incident not found", body = ApiError)
    ),
    tag = "incidents"
)]
pub async fn list_incident_updates(
    State(state): State<AppState>,
    session: Session,
    path: Result<Path<i32>, PathRejection>,
    query: Result<Query<TenantQuery>, QueryRejection>,
) -> Result<Json<Vec<IncidentUpdateResponse>>, ApiError> {
    let Path(incident_id) = path?;
    let Query(query) = query?;
    let incident_id = require_path_id("id", incident_id)?;
    let external_id = query.require()?;
    let organization_id = resolve_tenant(&state, &session, &external_id).await?;

    let updates = IncidentUpdateRepository::new(&state.db)
        .list(organization_id, incident_id)
        .await?;
    Ok(Json(updates.into_iter().map(Into::into).collect()))
}

/// Remove one update from an incident's timeline
#[utoipa::path(
    delete,
    path = "/api/incidents/{id}/updates/{update_id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Incident id"),
        ("update_id" = i32, Path, description = "Incident update id"),
        TenantQuery
    ),
    responses(
        (status = 200, description = "Update deleted", body = MessageResponse),
        (status = 400, description = "organization_id missing", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization, incident or update not found", body = ApiError)
    ),
    tag = "incidents"
)]
pub async fn delete_incident_update(
    State(state): State<AppState>,
    session: Session,
    path: Result<Path<(i32, i32)>, PathRejection>,
    query: Result<Query<TenantQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path((incident_id, update_id)) = path?;
    let Query(query) = query?;
    let incident_id = require_path_id("id", incident_id)?;
    let update_id = require_path_id("update_id", update_id)?;
    let external_id = query.require()?;
    let organization_id = resolve_tenant(&state, &session, &external_id).await?;

    IncidentUpdateRepository::new(&state.db)
        .delete(organization_id, incident_id, update_id)
        .await?;

    Ok(Json(MessageResponse::new("Incident update deleted successfully")))
}
