//! # Maintenance Repository

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::Expr,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{FieldErrors, RepositoryError, ServiceRepository, non_blank};
use crate::models::maintenance::{
    ActiveModel as MaintenanceActiveModel, Column, Entity as Maintenance, MaintenanceStatus,
    Model as MaintenanceModel,
};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct MaintenanceDraft {
    /// Identity-provider organization key
    #[schema(example = "org_acme")]
    pub organization_id: Option<String>,
    pub service_id: Option<i32>,
    #[schema(example = "Database upgrade")]
    pub title: Option<String>,
    pub description: Option<String>,
    /// RFC 3339 timestamp
    #[schema(example = "2026-01-15T02:00:00Z")]
    pub scheduled_start: Option<String>,
    /// RFC 3339 timestamp, not before `scheduled_start`
    #[schema(example = "2026-01-15T04:00:00Z")]
    pub scheduled_end: Option<String>,
    /// One of scheduled, in_progress, completed (default scheduled)
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMaintenance {
    pub organization_id: String,
    pub service_id: i32,
    pub title: String,
    pub description: String,
    pub scheduled_start: DateTime<FixedOffset>,
    pub scheduled_end: DateTime<FixedOffset>,
    pub status: MaintenanceStatus,
}

fn parse_timestamp(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
) -> Option<DateTime<FixedOffset>> {
    let raw = errors.require(field, value)?;
    // Stored in UTC so column order matches instant order.
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc).fixed_offset()),
        Err(_) => {
            errors.add(field, format!("{field} must be an RFC 3339 timestamp"));
            None
        }
    }
}

impl MaintenanceDraft {
    pub fn validate(self) -> Result<NewMaintenance, RepositoryError> {
        let mut errors = FieldErrors::new();
        let organization_id = errors.require("organization_id", self.organization_id);
        let service_id = errors.require_id("service_id", self.service_id);
        let title = errors.require("title", self.title);
        let scheduled_start = parse_timestamp(&mut errors, "scheduled_start", self.scheduled_start);
        let scheduled_end = parse_timestamp(&mut errors, "scheduled_end", self.scheduled_end);
        let status = non_blank(self.status)
            .and_then(|raw| errors.parse_enum::<MaintenanceStatus>("status", &raw));

        if let (Some(start), Some(end)) = (scheduled_start, scheduled_end)
            && end < start
        {
            errors.add(
                "scheduled_end",
                "scheduled_end must not be earlier than scheduled_start",
            );
        }
        errors.into_result()?;

        let now = Utc::now().fixed_offset();
        Ok(NewMaintenance {
            organization_id: organization_id.unwrap_or_default(),
            service_id: service_id.unwrap_or_default(),
            title: title.unwrap_or_default(),
            description: non_blank(self.description).unwrap_or_default(),
            scheduled_start: scheduled_start.unwrap_or(now),
            scheduled_end: scheduled_end.unwrap_or(now),
            status: status.unwrap_or_default(),
        })
    }
}

pub struct MaintenanceRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> MaintenanceRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        organization_id: i32,
        new: NewMaintenance,
    ) -> Result<MaintenanceModel, RepositoryError> {
        ServiceRepository::new(self.db)
            .require_owned(organization_id, new.service_id)
            .await?;

        let now = Utc::now().fixed_offset();
        let maintenance = MaintenanceActiveModel {
            organization_id: Set(organization_id),
            service_id: Set(new.service_id),
            title: Set(new.title),
            description: Set(new.description),
            scheduled_start: Set(new.scheduled_start),
            scheduled_end: Set(new.scheduled_end),
            status: Set(new.status),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        };

        Ok(maintenance.insert(self.db).await?)
    }

    pub async fn list(
        &self,
        organization_id: i32,
        service_id: Option<i32>,
    ) -> Result<Vec<MaintenanceModel>, RepositoryError> {
        let mut query = Maintenance::find()
            .filter(Column::OrganizationId.eq(organization_id))
            .filter(Column::DeletedAt.is_null());
        if let Some(service_id) = service_id {
            query = query.filter(Column::ServiceId.eq(service_id));
        }

        Ok(query.order_by_asc(Column::Id).all(self.db).await?)
    }

    /// Windows that have not completed, soonest first.
    pub async fn list_upcoming(
        &self,
        organization_id: i32,
    ) -> Result<Vec<MaintenanceModel>, RepositoryError> {
        Ok(Maintenance::find()
            .filter(Column::OrganizationId.eq(organization_id))
            .filter(Column::DeletedAt.is_null())
            .filter(Column::Status.ne(MaintenanceStatus::Completed))
            .order_by_asc(Column::ScheduledStart)
            .order_by_asc(Column::Id)
            .all(self.db)
            .await?)
    }

    pub async fn delete(
        &self,
        organization_id: i32,
        maintenance_id: i32,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().fixed_offset();
        let result = Maintenance::update_many()
            .col_expr(Column::DeletedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(maintenance_id))
            .filter(Column::OrganizationId.eq(organization_id))
            .filter(Column::DeletedAt.is_null())
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("Maintenance"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> MaintenanceDraft {
        MaintenanceDraft {
            organization_id: Some("org_acme".into()),
            service_id: Some(1),
            title: Some("Database upgrade".into()),
            description: None,
            scheduled_start: Some("2026-01-15T02:00:00Z".into()),
            scheduled_end: Some("2026-01-15T04:00:00+00:00".into()),
            status: None,
        }
    }

    #[test]
    fn defaults_status_to_scheduled() {
        let new = draft().validate().unwrap();
        assert_eq!(new.status, MaintenanceStatus::Scheduled);
        assert!(new.scheduled_end > new.scheduled_start);
    }

    #[test]
    fn rejects_end_before_start() {
        let err = MaintenanceDraft {
            scheduled_end: Some("2026-01-15T01:00:00Z".into()),
            ..draft()
        }
        .validate()
        .unwrap_err();

        match err {
            RepositoryError::Validation { fields, .. } => {
                assert!(fields.contains_key("scheduled_end"));
                assert_eq!(fields.len(), 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn normalizes_offsets_to_utc() {
        let new = MaintenanceDraft {
            scheduled_start: Some("2026-01-15T02:00:00+05:00".into()),
            scheduled_end: Some("2026-01-15T01:30:00+03:00".into()),
            ..draft()
        }
        .validate()
        .unwrap();

        assert_eq!(new.scheduled_start.offset().local_minus_utc(), 0);
        assert_eq!(new.scheduled_start.to_rfc3339(), "2026-01-14T21:00:00+00:00");
        assert_eq!(new.scheduled_end.to_rfc3339(), "2026-01-14T22:30:00+00:00");
    }

    #[test]
    fn rejects_malformed_timestamps() {
        let err = MaintenanceDraft {
            scheduled_start: Some("tomorrow".into()),
            ..draft()
        }
        .validate()
        .unwrap_err();

        assert!(matches!(
            err,
            RepositoryError::Validation { ref fields, .. } if fields["scheduled_start"].contains("RFC 3339")
        ));
    }
}
