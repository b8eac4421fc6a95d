//! # Service Repository
//!
//! Create, list and partially update services within one organization.
//! Deletion cascades and lives in [`crate::cascade`].

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{FieldErrors, RepositoryError, non_blank};
use crate::models::service::{
    ActiveModel as ServiceActiveModel, Column, Entity as Service, Model as ServiceModel,
    ServiceStatus,
};

/// Raw create payload for a service.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ServiceDraft {
    /// Identity-provider organization key
    #[schema(example = "org_acme")]
    pub organization_id: Option<String>,
    #[schema(example = "API")]
    pub name: Option<String>,
    pub description: Option<String>,
    /// One of operational, degraded_performance, partial_outage, major_outage
    #[schema(example = "operational")]
    pub status: Option<String>,
    /// Identity-provider user key of the creator
    #[schema(example = "user_2abc")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewService {
    pub organization_id: String,
    pub name: String,
    pub description: String,
    pub status: ServiceStatus,
    pub user_id: String,
}

impl ServiceDraft {
    pub fn validate(self) -> Result<NewService, RepositoryError> {
        let mut errors = FieldErrors::new();
        let organization_id = errors.require("organization_id", self.organization_id);
        let name = errors.require("name", self.name);
        let user_id = errors.require("user_id", self.user_id);
        let status = errors
            .require("status", self.status)
            .and_then(|raw| errors.parse_enum::<ServiceStatus>("status", &raw));
        errors.into_result()?;

        Ok(NewService {
            organization_id: organization_id.unwrap_or_default(),
            name: name.unwrap_or_default(),
            description: non_blank(self.description).unwrap_or_default(),
            status: status.unwrap_or_default(),
            user_id: user_id.unwrap_or_default(),
        })
    }
}

/// Raw partial update; absent or blank fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(example = "degraded_performance")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ServiceStatus>,
}

impl ServicePatch {
    pub fn validate(self) -> Result<ServiceChanges, RepositoryError> {
        let mut errors = FieldErrors::new();
        let status = non_blank(self.status)
            .and_then(|raw| errors.parse_enum::<ServiceStatus>("status", &raw));
        errors.into_result()?;

        Ok(ServiceChanges {
            name: non_blank(self.name),
            description: non_blank(self.description),
            status,
        })
    }
}

pub struct ServiceRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ServiceRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        organization_id: i32,
        new: NewService,
    ) -> Result<ServiceModel, RepositoryError> {
        let now = Utc::now().fixed_offset();

        let service = ServiceActiveModel {
            organization_id: Set(organization_id),
            name: Set(new.name),
            description: Set(new.description),
            status: Set(new.status),
            user_id: Set(new.user_id),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        };

        Ok(service.insert(self.db).await?)
    }

    pub async fn list(&self, organization_id: i32) -> Result<Vec<ServiceModel>, RepositoryError> {
        Ok(Service::find()
            .filter(Column::OrganizationId.eq(organization_id))
            .filter(Column::DeletedAt.is_null())
            .order_by_asc(Column::Id)
            .all(self.db)
            .await?)
    }

    /// A live service owned by the organization, if any.
    pub async fn find_owned(
        &self,
        organization_id: i32,
        service_id: i32,
    ) -> Result<Option<ServiceModel>, RepositoryError> {
        Ok(Service::find_by_id(service_id)
            .filter(Column::OrganizationId.eq(organization_id))
            .filter(Column::DeletedAt.is_null())
            .one(self.db)
            .await?)
    }

    pub async fn require_owned(
        &self,
        organization_id: i32,
        service_id: i32,
    ) -> Result<ServiceModel, RepositoryError> {
        self.find_owned(organization_id, service_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Service"))
    }

    pub async fn update(
        &self,
        organization_id: i32,
        service_id: i32,
        changes: ServiceChanges,
    ) -> Result<ServiceModel, RepositoryError> {
        let service = self.require_owned(organization_id, service_id).await?;

        let mut active = service.into_active_model();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        Ok(active.update(self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_requires_fields_and_known_status() {
        let err = ServiceDraft {
            organization_id: Some("org_acme".into()),
            status: Some("on_fire".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();

        match err {
            RepositoryError::Validation { fields, .. } => {
                assert_eq!(
                    fields.keys().map(String::as_str).collect::<Vec<_>>(),
                    vec!["name", "status", "user_id"]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn draft_trims_and_defaults_description() {
        let new = ServiceDraft {
            organization_id: Some(" org_acme ".into()),
            name: Some("API".into()),
            description: None,
            status: Some("operational".into()),
            user_id: Some("user_1".into()),
        }
        .validate()
        .unwrap();

        assert_eq!(new.organization_id, "org_acme");
        assert_eq!(new.description, "");
        assert_eq!(new.status, ServiceStatus::Operational);
    }

    #[test]
    fn patch_skips_blank_fields() {
        let changes = ServicePatch {
            name: Some("".into()),
            description: None,
            status: Some("degraded_performance".into()),
        }
        .validate()
        .unwrap();

        assert_eq!(
            changes,
            ServiceChanges {
                name: None,
                description: None,
                status: Some(ServiceStatus::DegradedPerformance),
            }
        );

        assert!(
            ServicePatch {
                status: Some("broken".into()),
                ..Default::default()
            }
            .validate()
            .is_err()
        );
    }
}
