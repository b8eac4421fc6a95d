//! # Service Handlers

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
use crate::handlers::types::{MessageResponse, ServiceResponse, TenantQuery, require_path_id};
use crate::repositories::{
    ServiceRepository,
    service::{ServiceDraft, ServicePatch},
};
use crate::server::AppState;

/// Create a service
#[utoipa::path(
    post,
    path = "/api/services/create",
    security(("bearer_auth" = [])),
    request_body = ServiceDraft,
    responses(
        (status = 201, description = "Service created", body = ServiceResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "services"
)]
pub async fn create_service(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<ServiceDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<ServiceResponse>), ApiError> {
    let Json(draft) = payload?;
    let new = draft.validate()?;
    let organization_id = resolve_tenant(&state, &session, &new.organization_id).await?;

    let service = ServiceRepository::new(&state.db)
        .create(organization_id, new)
        .await?;
    tracing::info!(organization_id, service_id = service.id, "Service created");

    Ok((StatusCode::CREATED, Json(service.into())))
}

/// List the services of an organization
#[utoipa::path(
    get,
    path = "/api/services/list",
    security(("bearer_auth" = [])),
    params(TenantQuery),
    responses(
        (status = 200, description = "Live services in creation order", body = Vec<ServiceResponse>),
        (status = 400, description = "organization_id missing", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization not found", body = ApiError)
    ),
    tag = "services"
)]
pub async fn list_services(
    State(state): State<AppState>,
    session: Session,
    query: Result<Query<TenantQuery>, QueryRejection>,
) -> Result<Json<Vec<ServiceResponse>>, ApiError> {
    let Query(query) = query?;
    let external_id = query.require()?;
    let organization_id = resolve_tenant(&state, &session, &external_id).await?;

    let services = ServiceRepository::new(&state.db)
        .list(organization_id)
        .await?;
    Ok(Json(services.into_iter().map(Into::into).collect()))
}

/// Partially update a service
#[utoipa::path(
    put,
    path = "/api/services/{id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Service id"),
        TenantQuery
    ),
    request_body = ServicePatch,
    responses(
        (status = 200, description = "Service updated", body = ServiceResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization or service not found", body = ApiError)
    ),
    tag = "services"
)]
pub async fn update_service(
    State(state): State<AppState>,
    session: Session,
    path: Result<Path<i32>, PathRejection>,
    query: Result<Query<TenantQuery>, QueryRejection>,
    payload: Result<Json<ServicePatch>, JsonRejection>,
) -> Result<Json<ServiceResponse>, ApiError> {
    let Path(service_id) = path?;
    let Query(query) = query?;
    let Json(patch) = payload?;
    let service_id = require_path_id("id", service_id)?;
    let external_id = query.require()?;
    let changes = patch.validate()?;
    let organization_id = resolve_tenant(&state, &session, &external_id).await?;

    let service = ServiceRepository::new(&state.db)
        .update(organization_id, service_id, changes)
        .await?;
    Ok(Json(service.into()))
}

/// Delete a service with its incidents, incident updates and maintenance
#[utoipa::path(
    delete,
    path = "/api/services/{id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Service id"),
        TenantQuery
    ),
    responses(
        (status = 200, description = "Service deleted", body = MessageResponse),
        (status = 400, description = "organization_id missing", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization or service not found", body = ApiError),
        (status = 500, description = "Transaction failed and was rolled back", body = ApiError)
    ),
    tag = "services"
)]
pub async fn delete_service(
    State(state): State<AppState>,
    session: Session,
    path: Result<Path<i32>, PathRejection>,
    query: Result<Query<TenantQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(service_id) = path?;
    let Query(query) = query?;
    let service_id = require_path_id("id", service_id)?;
    let external_id = query.require()?;
    let organization_id = resolve_tenant(&state, &session, &external_id).await?;

    CascadeCoordinator::new(&state.db)
        .delete_service(organization_id, service_id)
        .await?;

    Ok(Json(MessageResponse::new("Service deleted successfully")))
}
