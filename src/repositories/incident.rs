//! # Incident Repository
//!
//! Incidents are scoped by organization and by service. Mutations require the
//! caller to name both, and both must agree with the stored row.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{FieldErrors, RepositoryError, ServiceRepository, non_blank};
use crate::models::incident::{
    ActiveModel as IncidentActiveModel, Column, Entity as Incident, IncidentSeverity,
    IncidentStatus, Model as IncidentModel,
};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct IncidentDraft {
    /// Identity-provider organization key
    #[schema(example = "org_acme")]
    pub organization_id: Option<String>,
    pub service_id: Option<i32>,
    #[schema(example = "Outage")]
    pub title: Option<String>,
    pub description: Option<String>,
    /// One of investigating, identified, resolved
    #[schema(example = "investigating")]
    pub status: Option<String>,
    /// One of critical, high, medium, low
    pub severity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIncident {
    pub organization_id: String,
    pub service_id: i32,
    pub title: String,
    pub description: String,
    pub status: IncidentStatus,
    pub severity: Option<IncidentSeverity>,
}

impl IncidentDraft {
    pub fn validate(self) -> Result<NewIncident, RepositoryError> {
        let mut errors = FieldErrors::new();
        let organization_id = errors.require("organization_id", self.organization_id);
        let service_id = errors.require_id("service_id", self.service_id);
        let title = errors.require("title", self.title);
        let status = errors
            .require("status", self.status)
            .and_then(|raw| errors.parse_enum::<IncidentStatus>("status", &raw));
        let severity = non_blank(self.severity)
            .and_then(|raw| errors.parse_enum::<IncidentSeverity>("severity", &raw));
        errors.into_result()?;

        Ok(NewIncident {
            organization_id: organization_id.unwrap_or_default(),
            service_id: service_id.unwrap_or_default(),
            title: title.unwrap_or_default(),
            description: non_blank(self.description).unwrap_or_default(),
            status: status.unwrap_or(IncidentStatus::Investigating),
            severity,
        })
    }
}

/// Raw partial update; absent or blank fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct IncidentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(example = "resolved")]
    pub status: Option<String>,
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IncidentStatus>,
    pub severity: Option<IncidentSeverity>,
}

impl IncidentPatch {
    pub fn validate(self) -> Result<IncidentChanges, RepositoryError> {
        let mut errors = FieldErrors::new();
        let status = non_blank(self.status)
            .and_then(|raw| errors.parse_enum::<IncidentStatus>("status", &raw));
        let severity = non_blank(self.severity)
            .and_then(|raw| errors.parse_enum::<IncidentSeverity>("severity", &raw));
        errors.into_result()?;

        Ok(IncidentChanges {
            title: non_blank(self.title),
            description: non_blank(self.description),
            status,
            severity,
        })
    }
}

pub struct IncidentRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> IncidentRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts after checking the referenced service is live and owned.
    pub async fn create(
        &self,
        organization_id: i32,
        new: NewIncident,
    ) -> Result<IncidentModel, RepositoryError> {
        ServiceRepository::new(self.db)
            .require_owned(organization_id, new.service_id)
            .await?;

        let now = Utc::now().fixed_offset();
        let incident = IncidentActiveModel {
            organization_id: Set(organization_id),
            service_id: Set(new.service_id),
            title: Set(new.title),
            description: Set(new.description),
            status: Set(new.status),
            severity: Set(new.severity),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        };

        Ok(incident.insert(self.db).await?)
    }

    pub async fn list(
        &self,
        organization_id: i32,
        service_id: Option<i32>,
    ) -> Result<Vec<IncidentModel>, RepositoryError> {
        let mut query = Incident::find()
            .filter(Column::OrganizationId.eq(organization_id))
            .filter(Column::DeletedAt.is_null());
        if let Some(service_id) = service_id {
            query = query.filter(Column::ServiceId.eq(service_id));
        }

        Ok(query.order_by_asc(Column::Id).all(self.db).await?)
    }

    /// A live incident matching organization, service and id.
    pub async fn require_owned(
        &self,
        organization_id: i32,
        service_id: i32,
        incident_id: i32,
    ) -> Result<IncidentModel, RepositoryError> {
        Incident::find_by_id(incident_id)
            .filter(Column::OrganizationId.eq(organization_id))
            .filter(Column::ServiceId.eq(service_id))
            .filter(Column::DeletedAt.is_null())
            .one(self.db)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Incident"))
    }

    /// A live incident of the organization regardless of service.
    pub async fn require_in_organization(
        &self,
        organization_id: i32,
        incident_id: i32,
    ) -> Result<IncidentModel, RepositoryError> {
        Incident::find_by_id(incident_id)
            .filter(Column::OrganizationId.eq(organization_id))
            .filter(Column::DeletedAt.is_null())
            .one(self.db)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Incident"))
    }

    pub async fn update(
        &self,
        organization_id: i32,
        service_id: i32,
        incident_id: i32,
        changes: IncidentChanges,
    ) -> Result<IncidentModel, RepositoryError> {
        let incident = self
            .require_owned(organization_id, service_id, incident_id)
            .await?;

        let mut active = incident.into_active_model();
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        if let Some(severity) = changes.severity {
            active.severity = Set(Some(severity));
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        Ok(active.update(self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_rejects_unknown_status_and_severity() {
        let err = IncidentDraft {
            organization_id: Some("org_acme".into()),
            service_id: Some(0),
            title: Some("Outage".into()),
            status: Some("panicking".into()),
            severity: Some("apocalyptic".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();

        match err {
            RepositoryError::Validation { fields, .. } => {
                assert!(fields["status"].contains("investigating, identified, resolved"));
                assert!(fields["severity"].contains("critical"));
                assert!(fields["service_id"].contains("positive"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn draft_accepts_missing_severity() {
        let new = IncidentDraft {
            organization_id: Some("org_acme".into()),
            service_id: Some(3),
            title: Some("Outage".into()),
            status: Some("identified".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert_eq!(new.status, IncidentStatus::Identified);
        assert_eq!(new.severity, None);
    }
}
