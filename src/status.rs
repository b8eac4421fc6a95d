//! # Status aggregator
//!
//! Builds the public status view of one organization from explicit, filtered
//! reads. No transaction; every query sees only live rows.

use std::collections::HashMap;

use sea_orm::DatabaseConnection;

use crate::models::{incident, incident_update, maintenance, organization, service};
use crate::models::service::ServiceStatus;
use crate::repositories::{
    IncidentRepository, IncidentUpdateRepository, MaintenanceRepository, OrganizationRepository,
    RepositoryError, ServiceRepository,
};

/// An incident with its parent service and its timeline.
#[derive(Debug, Clone)]
pub struct IncidentTimeline {
    pub incident: incident::Model,
    pub service: Option<service::Model>,
    pub updates: Vec<incident_update::Model>,
}

#[derive(Debug, Clone)]
pub struct OrganizationStatus {
    pub organization: organization::Model,
    pub overall_status: ServiceStatus,
    pub services: Vec<service::Model>,
    pub incidents: Vec<IncidentTimeline>,
    pub maintenances: Vec<maintenance::Model>,
}

/// Worst status among the given services; operational when there are none.
pub fn overall_status<'s>(statuses: impl IntoIterator<Item = &'s ServiceStatus>) -> ServiceStatus {
    statuses
        .into_iter()
        .copied()
        .max_by_key(|status| status.severity_rank())
        .unwrap_or_default()
}

pub struct StatusAggregator<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> StatusAggregator<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn for_slug(&self, slug: &str) -> Result<OrganizationStatus, RepositoryError> {
        let organization = OrganizationRepository::new(self.db).resolve_slug(slug).await?;

        let services = ServiceRepository::new(self.db)
            .list(organization.id)
            .await?;
        let incidents = IncidentRepository::new(self.db)
            .list(organization.id, None)
            .await?;
        let updates = IncidentUpdateRepository::new(self.db)
            .list_for_organization(organization.id)
            .await?;
        let maintenances = MaintenanceRepository::new(self.db)
            .list_upcoming(organization.id)
            .await?;

        let mut updates_by_incident: HashMap<i32, Vec<incident_update::Model>> = HashMap::new();
        for update in updates {
            updates_by_incident
                .entry(update.incident_id)
                .or_default()
                .push(update);
        }

        let services_by_id: HashMap<i32, &service::Model> =
            services.iter().map(|service| (service.id, service)).collect();

        let incidents = incidents
            .into_iter()
            .map(|incident| IncidentTimeline {
                service: services_by_id.get(&incident.service_id).map(|s| (*s).clone()),
                updates: updates_by_incident.remove(&incident.id).unwrap_or_default(),
                incident,
            })
            .collect();

        Ok(OrganizationStatus {
            overall_status: overall_status(services.iter().map(|service| &service.status)),
            organization,
            services,
            incidents,
            maintenances,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_status_picks_worst() {
        assert_eq!(
            overall_status(Vec::<&ServiceStatus>::new()),
            ServiceStatus::Operational
        );
        assert_eq!(
            overall_status([
                &ServiceStatus::Operational,
                &ServiceStatus::PartialOutage,
                &ServiceStatus::DegradedPerformance,
            ]),
            ServiceStatus::PartialOutage
        );
        assert_eq!(
            overall_status([&ServiceStatus::MajorOutage, &ServiceStatus::Operational]),
            ServiceStatus::MajorOutage
        );
    }
}
