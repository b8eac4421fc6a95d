//! # Maintenance Handlers

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
use crate::handlers::types::{
    MaintenanceResponse, MessageResponse, ServiceScopedQuery, TenantQuery, require_path_id,
};
use crate::repositories::{MaintenanceRepository, maintenance::MaintenanceDraft};
use crate::server::AppState;

/// Schedule a maintenance window for a service
#[utoipa::path(
    post,
    path = "/api/maintenances/create",
    security(("bearer_auth" = [])),
    request_body = MaintenanceDraft,
    responses(
        (status = 201, description = "Maintenance scheduled", body = MaintenanceResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization or service not found", body = ApiError)
    ),
    tag = "maintenances"
)]
pub async fn create_maintenance(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<MaintenanceDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<MaintenanceResponse>), ApiError> {
    let Json(draft) = payload?;
    let new = draft.validate()?;
    let organization_id = resolve_tenant(&state, &session, &new.organization_id).await?;

    let maintenance = MaintenanceRepository::new(&state.db)
        .create(organization_id, new)
        .await?;
    tracing::info!(
        organization_id,
        service_id = maintenance.service_id,
        maintenance_id = maintenance.id,
        "Maintenance scheduled"
    );

    Ok((StatusCode::CREATED, Json(maintenance.into())))
}

/// List maintenance windows of an organization, optionally for one service
#[utoipa::path(
    get,
    path = "/api/maintenances/list",
    security(("bearer_auth" = [])),
    params(ServiceScopedQuery),
    responses(
        (status = 200, description = "Live maintenance windows in creation order", body = Vec<MaintenanceResponse>),
        (status = 400, description = "organization_id missing", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization not found", body = ApiError)
    ),
    tag = "maintenances"
)]
pub async fn list_maintenances(
    State(state): State<AppState>,
    session: Session,
    query: Result<Query<ServiceScopedQuery>, QueryRejection>,
) -> Result<Json<Vec<MaintenanceResponse>>, ApiError> {
    let Query(query) = query?;
    let (external_id, service_id) = query.require_organization()?;
    let organization_id = resolve_tenant(&state, &session, &external_id).await?;

    let maintenances = MaintenanceRepository::new(&state.db)
        .list(organization_id, service_id)
        .await?;
    Ok(Json(maintenances.into_iter().map(Into::into).collect()))
}

/// Cancel a maintenance window
#[utoipa::path(
    delete,
    path = "/api/maintenances/{id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Maintenance id"),
        TenantQuery
    ),
    responses(
        (status = 200, description = "Maintenance deleted", body = MessageResponse),
        (status = 400, description = "organization_id missing", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization or maintenance not found", body = ApiError)
    ),
    tag = "maintenances"
)]
pub async fn delete_maintenance(
    State(state): State<AppState>,
    session: Session,
    path: Result<Path<i32>, PathRejection>,
    query: Result<Query<TenantQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(maintenance_id) = path?;
    let Query(query) = query?;
    let maintenance_id = require_path_id("id", maintenance_id)?;
    let external_id = query.require()?;
    let organization_id = resolve_tenant(&state, &session, &external_id).await?;

    MaintenanceRepository::new(&state.db)
        .delete(organization_id, maintenance_id)
        .await?;

    Ok(Json(MessageResponse::new("Maintenance deleted successfully")))
}
