//! # Cascade deletes
//!
//! Removing a service, incident or organization soft-deletes its dependents
//! first and the owning row last, inside a single transaction. Ownership is
//! checked before the transaction opens. A failing step rolls back every
//! earlier one.

use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryFilter,
    TransactionTrait,
    sea_query::{Expr, Query},
};
use serde::Serialize;
use tracing::{error, info};

use crate::models::{
    incident, incident_update, maintenance, organization, organization_member, service,
};
use crate::repositories::{IncidentRepository, RepositoryError, ServiceRepository};

/// Rows soft-deleted by one cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub incident_updates: u64,
    pub incidents: u64,
    pub maintenances: u64,
    pub services: u64,
    pub members: u64,
}

pub struct CascadeCoordinator<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CascadeCoordinator<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Deletes a service with its incidents, their updates and its maintenance windows.
    pub async fn delete_service(
        &self,
        organization_id: i32,
        service_id: i32,
    ) -> Result<CascadeReport, RepositoryError> {
        ServiceRepository::new(self.db)
            .require_owned(organization_id, service_id)
            .await?;

        let txn = self.db.begin().await.map_err(RepositoryError::Transaction)?;
        let now = Utc::now().fixed_offset();

        let outcome = async {
            let mut report = CascadeReport::default();

            report.incident_updates = step(
                incident_update::Entity::update_many()
                    .col_expr(incident_update::Column::DeletedAt, Expr::value(now))
                    .col_expr(incident_update::Column::UpdatedAt, Expr::value(now))
                    .filter(
                        incident_update::Column::IncidentId.in_subquery(
                            Query::select()
                                .column(incident::Column::Id)
                                .from(incident::Entity)
                                .and_where(incident::Column::ServiceId.eq(service_id))
                                .to_owned(),
                        ),
                    )
                    .filter(incident_update::Column::DeletedAt.is_null())
                    .exec(&txn)
                    .await,
            )?;

            report.incidents = step(
                incident::Entity::update_many()
                    .col_expr(incident::Column::DeletedAt, Expr::value(now))
                    .col_expr(incident::Column::UpdatedAt, Expr::value(now))
                    .filter(incident::Column::ServiceId.eq(service_id))
                    .filter(incident::Column::DeletedAt.is_null())
                    .exec(&txn)
                    .await,
            )?;

            report.maintenances = step(
                maintenance::Entity::update_many()
                    .col_expr(maintenance::Column::DeletedAt, Expr::value(now))
                    .col_expr(maintenance::Column::UpdatedAt, Expr::value(now))
                    .filter(maintenance::Column::ServiceId.eq(service_id))
                    .filter(maintenance::Column::DeletedAt.is_null())
                    .exec(&txn)
                    .await,
            )?;

            report.services = step(
                service::Entity::update_many()
                    .col_expr(service::Column::DeletedAt, Expr::value(now))
                    .col_expr(service::Column::UpdatedAt, Expr::value(now))
                    .filter(service::Column::Id.eq(service_id))
                    .filter(service::Column::OrganizationId.eq(organization_id))
                    .filter(service::Column::DeletedAt.is_null())
                    .exec(&txn)
                    .await,
            )?;
            if report.services == 0 {
                return Err(RepositoryError::not_found("Service"));
            }

            Ok(report)
        }
        .await;

        let report = finish(txn, outcome).await?;
        info!(
            organization_id,
            service_id,
            incidents = report.incidents,
            incident_updates = report.incident_updates,
            maintenances = report.maintenances,
            "Service deleted"
        );
        Ok(report)
    }

    /// Deletes an incident and its updates.
    pub async fn delete_incident(
        &self,
        organization_id: i32,
        service_id: i32,
        incident_id: i32,
    ) -> Result<CascadeReport, RepositoryError> {
        IncidentRepository::new(self.db)
            .require_owned(organization_id, service_id, incident_id)
            .await?;

        let txn = self.db.begin().await.map_err(RepositoryError::Transaction)?;
        let now = Utc::now().fixed_offset();

        let outcome = async {
            let mut report = CascadeReport::default();

            report.incident_updates = step(
                incident_update::Entity::update_many()
                    .col_expr(incident_update::Column::DeletedAt, Expr::value(now))
                    .col_expr(incident_update::Column::UpdatedAt, Expr::value(now))
                    .filter(incident_update::Column::IncidentId.eq(incident_id))
                    .filter(incident_update::Column::DeletedAt.is_null())
                    .exec(&txn)
                    .await,
            )?;

            report.incidents = step(
                incident::Entity::update_many()
                    .col_expr(incident::Column::DeletedAt, Expr::value(now))
                    .col_expr(incident::Column::UpdatedAt, Expr::value(now))
                    .filter(incident::Column::Id.eq(incident_id))
                    .filter(incident::Column::OrganizationId.eq(organization_id))
                    .filter(incident::Column::ServiceId.eq(service_id))
                    .filter(incident::Column::DeletedAt.is_null())
                    .exec(&txn)
                    .await,
            )?;
            if report.incidents == 0 {
                return Err(RepositoryError::not_found("Incident"));
            }

            Ok(report)
        }
        .await;

        let report = finish(txn, outcome).await?;
        info!(
            organization_id,
            service_id,
            incident_id,
            incident_updates = report.incident_updates,
            "Incident deleted"
        );
        Ok(report)
    }

    /// Deletes an organization and everything it owns.
    pub async fn delete_organization(
        &self,
        organization_id: i32,
    ) -> Result<CascadeReport, RepositoryError> {
        organization::Entity::find_by_id(organization_id)
            .filter(organization::Column::DeletedAt.is_null())
            .one(self.db)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Organization"))?;

        let txn = self.db.begin().await.map_err(RepositoryError::Transaction)?;
        let now = Utc::now().fixed_offset();

        let outcome = async {
            let mut report = CascadeReport::default();

            report.incident_updates = step(
                incident_update::Entity::update_many()
                    .col_expr(incident_update::Column::DeletedAt, Expr::value(now))
                    .col_expr(incident_update::Column::UpdatedAt, Expr::value(now))
                    .filter(
                        incident_update::Column::IncidentId.in_subquery(
                            Query::select()
                                .column(incident::Column::Id)
                                .from(incident::Entity)
                                .and_where(incident::Column::OrganizationId.eq(organization_id))
                                .to_owned(),
                        ),
                    )
                    .filter(incident_update::Column::DeletedAt.is_null())
                    .exec(&txn)
                    .await,
            )?;

            report.incidents = step(
                incident::Entity::update_many()
                    .col_expr(incident::Column::DeletedAt, Expr::value(now))
                    .col_expr(incident::Column::UpdatedAt, Expr::value(now))
                    .filter(incident::Column::OrganizationId.eq(organization_id))
                    .filter(incident::Column::DeletedAt.is_null())
                    .exec(&txn)
                    .await,
            )?;

            report.maintenances = step(
                maintenance::Entity::update_many()
                    .col_expr(maintenance::Column::DeletedAt, Expr::value(now))
                    .col_expr(maintenance::Column::UpdatedAt, Expr::value(now))
                    .filter(maintenance::Column::OrganizationId.eq(organization_id))
                    .filter(maintenance::Column::DeletedAt.is_null())
                    .exec(&txn)
                    .await,
            )?;

            report.services = step(
                service::Entity::update_many()
                    .col_expr(service::Column::DeletedAt, Expr::value(now))
                    .col_expr(service::Column::UpdatedAt, Expr::value(now))
                    .filter(service::Column::OrganizationId.eq(organization_id))
                    .filter(service::Column::DeletedAt.is_null())
                    .exec(&txn)
                    .await,
            )?;

            report.members = step(
                organization_member::Entity::update_many()
                    .col_expr(organization_member::Column::DeletedAt, Expr::value(now))
                    .col_expr(organization_member::Column::UpdatedAt, Expr::value(now))
                    .filter(organization_member::Column::OrganizationId.eq(organization_id))
                    .filter(organization_member::Column::DeletedAt.is_null())
                    .exec(&txn)
                    .await,
            )?;

            let organizations = step(
                organization::Entity::update_many()
                    .col_expr(organization::Column::DeletedAt, Expr::value(now))
                    .col_expr(organization::Column::UpdatedAt, Expr::value(now))
                    .filter(organization::Column::Id.eq(organization_id))
                    .filter(organization::Column::DeletedAt.is_null())
                    .exec(&txn)
                    .await,
            )?;
            if organizations == 0 {
                return Err(RepositoryError::not_found("Organization"));
            }

            Ok(report)
        }
        .await;

        let report = finish(txn, outcome).await?;
        info!(
            organization_id,
            services = report.services,
            incidents = report.incidents,
            members = report.members,
            "Organization deleted"
        );
        Ok(report)
    }
}

fn step(result: Result<sea_orm::UpdateResult, DbErr>) -> Result<u64, RepositoryError> {
    result
        .map(|res| res.rows_affected)
        .map_err(RepositoryError::Transaction)
}

/// Commits on success, otherwise rolls back and returns the original error.
async fn finish(
    txn: DatabaseTransaction,
    outcome: Result<CascadeReport, RepositoryError>,
) -> Result<CascadeReport, RepositoryError> {
    match outcome {
        Ok(report) => {
            txn.commit().await.map_err(RepositoryError::Transaction)?;
            Ok(report)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                error!(error = %rollback_err, "Failed to roll back cascade transaction");
            }
            Err(err)
        }
    }
}
