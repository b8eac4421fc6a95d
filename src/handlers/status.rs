//! # Public Status Handler

use axum::{
    extract::{Path, State, rejection::PathRejection},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::handlers::types::{
    IncidentUpdateResponse, MaintenanceResponse, ServiceResponse,
};
use crate::models::incident::{IncidentSeverity, IncidentStatus};
use crate::models::service::ServiceStatus;
use crate::server::AppState;
use crate::status::{IncidentTimeline, OrganizationStatus, StatusAggregator};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusOrganization {
    pub id: i32,
    #[schema(example = "Acme Inc")]
    pub name: String,
    #[schema(example = "acme")]
    pub slug: String,
}

/// An incident as shown on the public page
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusIncident {
    pub id: i32,
    pub service_id: i32,
    pub title: String,
    pub description: String,
    pub status: IncidentStatus,
    pub severity: Option<IncidentSeverity>,
    pub created_at: String,
    pub updated_at: String,
    /// Parent service, absent if it is no longer live
    pub service: Option<ServiceResponse>,
    /// Timeline, oldest first
    pub updates: Vec<IncidentUpdateResponse>,
}

impl From<IncidentTimeline> for StatusIncident {
    fn from(timeline: IncidentTimeline) -> Self {
        let IncidentTimeline {
            incident,
            service,
            updates,
        } = timeline;

        Self {
            id: incident.id,
            service_id: incident.service_id,
            title: incident.title,
            description: incident.description,
            status: incident.status,
            severity: incident.severity,
            created_at: incident.created_at.to_rfc3339(),
            updated_at: incident.updated_at.to_rfc3339(),
            service: service.map(Into::into),
            updates: updates.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub organization: StatusOrganization,
    /// Worst status among live services
    pub overall_status: ServiceStatus,
    pub services: Vec<ServiceResponse>,
    pub incidents: Vec<StatusIncident>,
    /// Windows not yet completed, soonest first
    pub maintenances: Vec<MaintenanceResponse>,
}

impl From<OrganizationStatus> for StatusResponse {
    fn from(status: OrganizationStatus) -> Self {
        Self {
            organization: StatusOrganization {
                id: status.organization.id,
                name: status.organization.name,
                slug: status.organization.slug,
            },
            overall_status: status.overall_status,
            services: status.services.into_iter().map(Into::into).collect(),
            incidents: status.incidents.into_iter().map(Into::into).collect(),
            maintenances: status.maintenances.into_iter().map(Into::into).collect(),
        }
    }
}

/// Public status page for an organization
#[utoipa::path(
    get,
    path = "/api/organizations/{slug}/status",
    params(("slug" = String, Path, description = "Organization slug")),
    responses(
        (status = 200, description = "Current status", body = StatusResponse),
        (status = 404, description = "Organization not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "status"
)]
pub async fn get_status(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Path(slug) = path?;
    let status = StatusAggregator::new(&state.db).for_slug(&slug).await?;
    Ok(Json(status.into()))
}
