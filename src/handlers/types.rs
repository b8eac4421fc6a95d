//! # Common API Types
//!
//! Response bodies shared by the management and public handlers. Timestamps
//! are RFC 3339 strings.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::models::{
    incident::{self, IncidentSeverity, IncidentStatus},
    incident_update,
    maintenance::{self, MaintenanceStatus},
    organization,
    organization_member::{self, MemberRole},
    service::{self, ServiceStatus},
};
use crate::repositories::FieldErrors;

/// Acknowledgement body for deletes and webhook deliveries
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Service deleted")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Organization scope of a management request
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TenantQuery {
    /// Identity-provider organization key
    pub organization_id: Option<String>,
}

impl TenantQuery {
    pub fn require(self) -> Result<String, ApiError> {
        let mut errors = FieldErrors::new();
        let organization_id = errors.require("organization_id", self.organization_id);
        errors.into_result()?;
        Ok(organization_id.unwrap_or_default())
    }
}

/// Organization scope plus an optional service filter
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ServiceScopedQuery {
    /// Identity-provider organization key
    pub organization_id: Option<String>,
    /// Internal service id
    pub service_id: Option<i32>,
}

impl ServiceScopedQuery {
    /// Both keys present, as required by incident mutations.
    pub fn require_both(self) -> Result<(String, i32), ApiError> {
        let mut errors = FieldErrors::new();
        let organization_id = errors.require("organization_id", self.organization_id);
        let service_id = errors.require_id("service_id", self.service_id);
        errors.into_result()?;
        Ok((
            organization_id.unwrap_or_default(),
            service_id.unwrap_or_default(),
        ))
    }

    pub fn require_organization(self) -> Result<(String, Option<i32>), ApiError> {
        let service_id = self.service_id;
        let organization_id = TenantQuery {
            organization_id: self.organization_id,
        }
        .require()?;
        Ok((organization_id, service_id))
    }
}

/// Reports a path id that cannot identify a row.
pub fn require_path_id(field: &str, id: i32) -> Result<i32, ApiError> {
    let mut errors = FieldErrors::new();
    let id = errors.require_id(field, Some(id));
    errors.into_result()?;
    Ok(id.unwrap_or_default())
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrganizationResponse {
    pub id: i32,
    #[schema(example = "org_2fDz8sLk9PZJmRnQ4tGbWALeExi")]
    pub external_id: String,
    #[schema(example = "Acme Inc")]
    pub name: String,
    #[schema(example = "acme")]
    pub slug: String,
    #[schema(example = "2026-01-15T10:30:00+00:00")]
    pub created_at: String,
    pub updated_at: String,
}

impl From<organization::Model> for OrganizationResponse {
    fn from(model: organization::Model) -> Self {
        Self {
            id: model.id,
            external_id: model.external_id,
            name: model.name,
            slug: model.slug,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceResponse {
    pub id: i32,
    pub organization_id: i32,
    #[schema(example = "API")]
    pub name: String,
    pub description: String,
    pub status: ServiceStatus,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<service::Model> for ServiceResponse {
    fn from(model: service::Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            name: model.name,
            description: model.description,
            status: model.status,
            user_id: model.user_id,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IncidentResponse {
    pub id: i32,
    pub organization_id: i32,
    pub service_id: i32,
    #[schema(example = "Outage")]
    pub title: String,
    pub description: String,
    pub status: IncidentStatus,
    pub severity: Option<IncidentSeverity>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<incident::Model> for IncidentResponse {
    fn from(model: incident::Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            service_id: model.service_id,
            title: model.title,
            description: model.description,
            status: model.status,
            severity: model.severity,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IncidentUpdateResponse {
    pub id: i32,
    pub incident_id: i32,
    #[schema(example = "We are looking into elevated error rates.")]
    pub message: String,
    pub created_at: String,
}

impl From<incident_update::Model> for IncidentUpdateResponse {
    fn from(model: incident_update::Model) -> Self {
        Self {
            id: model.id,
            incident_id: model.incident_id,
            message: model.message,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MaintenanceResponse {
    pub id: i32,
    pub organization_id: i32,
    pub service_id: i32,
    #[schema(example = "Database upgrade")]
    pub title: String,
    pub description: String,
    pub scheduled_start: String,
    pub scheduled_end: String,
    pub status: MaintenanceStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<maintenance::Model> for MaintenanceResponse {
    fn from(model: maintenance::Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            service_id: model.service_id,
            title: model.title,
            description: model.description,
            scheduled_start: model.scheduled_start.to_rfc3339(),
            scheduled_end: model.scheduled_end.to_rfc3339(),
            status: model.status,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MemberResponse {
    pub id: i32,
    pub organization_id: i32,
    #[schema(example = "user_2abc")]
    pub user_id: String,
    pub role: MemberRole,
    pub created_at: String,
}

impl From<organization_member::Model> for MemberResponse {
    fn from(model: organization_member::Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            user_id: model.user_id,
            role: model.role,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}
