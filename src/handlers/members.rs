//! # Member Handlers

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
use crate::handlers::types::{MemberResponse, MessageResponse, TenantQuery, require_path_id};
use crate::repositories::{MemberRepository, member::MemberDraft};
use crate::server::AppState;

/// Add a user to an organization
#[utoipa::path(
    post,
    path = "/api/members/create",
    security(("bearer_auth" = [])),
    request_body = MemberDraft,
    responses(
        (status = 201, description = "Member added", body = MemberResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization not found", body = ApiError),
        (status = 409, description = "User is already a member", body = ApiError)
    ),
    tag = "members"
)]
pub async fn create_member(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<MemberDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<MemberResponse>), ApiError> {
    let Json(draft) = payload?;
    let new = draft.validate()?;
    let organization_id = resolve_tenant(&state, &session, &new.organization_id).await?;

    let member = MemberRepository::new(&state.db)
        .create(organization_id, new)
        .await?;

    Ok((StatusCode::CREATED, Json(member.into())))
}

/// List an organization's members
#[utoipa::path(
    get,
    path = "/api/members/list",
    security(("bearer_auth" = [])),
    params(TenantQuery),
    responses(
        (status = 200, description = "Live members", body = Vec<MemberResponse>),
        (status = 400, description = "organization_id missing", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization not found", body = ApiError)
    ),
    tag = "members"
)]
pub async fn list_members(
    State(state): State<AppState>,
    session: Session,
    query: Result<Query<TenantQuery>, QueryRejection>,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    let Query(query) = query?;
    let external_id = query.require()?;
    let organization_id = resolve_tenant(&state, &session, &external_id).await?;

    let members = MemberRepository::new(&state.db)
        .list(organization_id)
        .await?;
    Ok(Json(members.into_iter().map(Into::into).collect()))
}

/// Remove a user from an organization
#[utoipa::path(
    delete,
    path = "/api/members/{id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member id"),
        TenantQuery
    ),
    responses(
        (status = 200, description = "Member removed", body = MessageResponse),
        (status = 400, description = "organization_id missing", body = ApiError),
        (status = 401, description = "Missing or invalid session token", body = ApiError),
        (status = 404, description = "Organization or member not found", body = ApiError)
    ),
    tag = "members"
)]
pub async fn delete_member(
    State(state): State<AppState>,
    session: Session,
    path: Result<Path<i32>, PathRejection>,
    query: Result<Query<TenantQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(member_id) = path?;
    let Query(query) = query?;
    let member_id = require_path_id("id", member_id)?;
    let external_id = query.require()?;
    let organization_id = resolve_tenant(&state, &session, &external_id).await?;

    MemberRepository::new(&state.db)
        .delete(organization_id, member_id)
        .await?;

    Ok(Json(MessageResponse::new("Member removed successfully")))
}
