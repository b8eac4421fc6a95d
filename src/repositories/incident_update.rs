//! # Incident Update Repository
//!
//! Append-only timeline entries. Reads return creation order.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::{Expr, Query, SimpleExpr},
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{FieldErrors, IncidentRepository, RepositoryError};
use crate::models::incident;
use crate::models::incident_update::{
    ActiveModel as IncidentUpdateActiveModel, Column, Entity as IncidentUpdate,
    Model as IncidentUpdateModel,
};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct IncidentUpdateDraft {
    /// Identity-provider organization key
    #[schema(example = "org_acme")]
    pub organization_id: Option<String>,
    #[schema(example = "We are looking into elevated error rates.")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIncidentUpdate {
    pub organization_id: String,
    pub message: String,
}

impl IncidentUpdateDraft {
    pub fn validate(self) -> Result<NewIncidentUpdate, RepositoryError> {
        let mut errors = FieldErrors::new();
        let organization_id = errors.require("organization_id", self.organization_id);
        let message = errors.require("message", self.message);
        errors.into_result()?;

        Ok(NewIncidentUpdate {
            organization_id: organization_id.unwrap_or_default(),
            message: message.unwrap_or_default(),
        })
    }
}

pub struct IncidentUpdateRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> IncidentUpdateRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        organization_id: i32,
        incident_id: i32,
        message: String,
    ) -> Result<IncidentUpdateModel, RepositoryError> {
        IncidentRepository::new(self.db)
            .require_in_organization(organization_id, incident_id)
            .await?;

        let now = Utc::now().fixed_offset();
        let update = IncidentUpdateActiveModel {
            incident_id: Set(incident_id),
            message: Set(message),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        };

        Ok(update.insert(self.db).await?)
    }

    pub async fn list(
        &self,
        organization_id: i32,
        incident_id: i32,
    ) -> Result<Vec<IncidentUpdateModel>, RepositoryError> {
        IncidentRepository::new(self.db)
            .require_in_organization(organization_id, incident_id)
            .await?;

        self.live_in_order(Column::IncidentId.eq(incident_id)).await
    }

    /// Live updates of every live incident in the organization, each
    /// incident's entries in creation order.
    pub async fn list_for_organization(
        &self,
        organization_id: i32,
    ) -> Result<Vec<IncidentUpdateModel>, RepositoryError> {
        self.live_in_order(
            Column::IncidentId.in_subquery(
                Query::select()
                    .column(incident::Column::Id)
                    .from(incident::Entity)
                    .and_where(incident::Column::OrganizationId.eq(organization_id))
                    .and_where(incident::Column::DeletedAt.is_null())
                    .to_owned(),
            ),
        )
        .await
    }

    async fn live_in_order(
        &self,
        condition: SimpleExpr,
    ) -> Result<Vec<IncidentUpdateModel>, RepositoryError> {
        Ok(IncidentUpdate::find()
            .filter(condition)
            .filter(Column::DeletedAt.is_null())
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(self.db)
            .await?)
    }

    /// Soft-deletes one update after checking the incident belongs to the organization.
    pub async fn delete(
        &self,
        organization_id: i32,
        incident_id: i32,
        update_id: i32,
    ) -> Result<(), RepositoryError> {
        IncidentRepository::new(self.db)
            .require_in_organization(organization_id, incident_id)
            .await?;

        let now = Utc::now().fixed_offset();
        let result = IncidentUpdate::update_many()
            .col_expr(Column::DeletedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(update_id))
            .filter(Column::IncidentId.eq(incident_id))
            .filter(Column::DeletedAt.is_null())
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("Incident update"));
        }
        Ok(())
    }
}
