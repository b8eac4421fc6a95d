//! Demo data seeding
//!
//! Populates an empty database with the "Tech Corp" organization, its members,
//! two services, incidents with timelines and an upcoming maintenance window.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sea_orm::DatabaseConnection;

use crate::models::{
    incident::{IncidentSeverity, IncidentStatus},
    maintenance::MaintenanceStatus,
    organization_member::MemberRole,
    service::ServiceStatus,
};
use crate::repositories::{
    IncidentRepository, IncidentUpdateRepository, MaintenanceRepository, MemberRepository,
    OrganizationRepository, ServiceRepository,
    incident::NewIncident,
    maintenance::NewMaintenance,
    member::NewMember,
    organization::NewOrganization,
    service::NewService,
};

pub const DEMO_EXTERNAL_ID: &str = "org_2fDz8sLk9PZJmRnQ4tGbWALeExi";
pub const DEMO_SLUG: &str = "tech-corp";

const ADMIN_USER: &str = "user_2fDz8sLk9PZJmRnQ4tGbWALeExi";
const MEMBER_USER: &str = "user_5tHj4kLm7PdRnQ9WzVbCXeExiAl";

/// Row counts written by [`seed_demo`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub organizations: usize,
    pub members: usize,
    pub services: usize,
    pub incidents: usize,
    pub incident_updates: usize,
    pub maintenances: usize,
}

/// Seeds the demo organization under `external_id`. An organization already
/// mirrored under that key is left untouched.
pub async fn seed_demo(db: &DatabaseConnection, external_id: &str) -> Result<SeedSummary> {
    let organizations = OrganizationRepository::new(db);
    if organizations
        .find_live_by_external_id(external_id)
        .await?
        .is_some()
    {
        log::info!("Organization '{}' already exists, skipping seed", external_id);
        return Ok(SeedSummary::default());
    }

    let mut summary = SeedSummary::default();

    let org = organizations
        .create(NewOrganization {
            external_id: external_id.to_string(),
            name: "Tech Corp".to_string(),
            slug: DEMO_SLUG.to_string(),
        })
        .await
        .context("creating demo organization")?;
    summary.organizations += 1;

    let members = MemberRepository::new(db);
    for (user_id, role) in [(ADMIN_USER, MemberRole::Admin), (MEMBER_USER, MemberRole::Member)] {
        members
            .create(
                org.id,
                NewMember {
                    organization_id: external_id.to_string(),
                    user_id: user_id.to_string(),
                    role,
                },
            )
            .await
            .with_context(|| format!("adding member {user_id}"))?;
        summary.members += 1;
    }

    let services = ServiceRepository::new(db);
    let api = services
        .create(
            org.id,
            NewService {
                organization_id: external_id.to_string(),
                name: "API Service".to_string(),
                description: "Core application API".to_string(),
                status: ServiceStatus::Operational,
                user_id: ADMIN_USER.to_string(),
            },
        )
        .await?;
    let database = services
        .create(
            org.id,
            NewService {
                organization_id: external_id.to_string(),
                name: "Database Cluster".to_string(),
                description: "Primary PostgreSQL database".to_string(),
                status: ServiceStatus::DegradedPerformance,
                user_id: ADMIN_USER.to_string(),
            },
        )
        .await?;
    summary.services += 2;

    let incidents = [
        (
            api.id,
            "API Latency Spike",
            "Increased response times across endpoints",
            IncidentStatus::Identified,
            IncidentSeverity::High,
            vec![
                "Initial investigation started",
                "Identified overloaded caching layer",
            ],
        ),
        (
            database.id,
            "Database Replication Lag",
            "Primary-replica synchronization delay",
            IncidentStatus::Investigating,
            IncidentSeverity::Medium,
            vec!["Monitoring alerts triggered"],
        ),
    ];

    let incident_repo = IncidentRepository::new(db);
    let update_repo = IncidentUpdateRepository::new(db);
    for (service_id, title, description, status, severity, updates) in incidents {
        let incident = incident_repo
            .create(
                org.id,
                NewIncident {
                    organization_id: external_id.to_string(),
                    service_id,
                    title: title.to_string(),
                    description: description.to_string(),
                    status,
                    severity: Some(severity),
                },
            )
            .await
            .with_context(|| format!("creating incident '{title}'"))?;
        summary.incidents += 1;

        for message in updates {
            update_repo
                .create(org.id, incident.id, message.to_string())
                .await?;
            summary.incident_updates += 1;
        }
    }

    let start = Utc::now().fixed_offset() + Duration::hours(24);
    MaintenanceRepository::new(db)
        .create(
            org.id,
            NewMaintenance {
                organization_id: external_id.to_string(),
                service_id: database.id,
                title: "Database Version Upgrade".to_string(),
                description: "Planned PostgreSQL 14 -> 15 upgrade".to_string(),
                scheduled_start: start,
                scheduled_end: start + Duration::hours(2),
                status: MaintenanceStatus::Scheduled,
            },
        )
        .await?;
    summary.maintenances += 1;

    log::info!("Seeded demo organization '{}' ({})", DEMO_SLUG, external_id);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusAggregator;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    #[tokio::test]
    async fn seeds_once_and_renders_status() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let summary = seed_demo(&db, DEMO_EXTERNAL_ID).await.unwrap();
        assert_eq!(summary.services, 2);
        assert_eq!(summary.incident_updates, 3);

        let again = seed_demo(&db, DEMO_EXTERNAL_ID).await.unwrap();
        assert_eq!(again, SeedSummary::default());

        let status = StatusAggregator::new(&db).for_slug(DEMO_SLUG).await.unwrap();
        assert_eq!(status.overall_status, ServiceStatus::DegradedPerformance);
        assert_eq!(status.incidents.len(), 2);
        assert_eq!(status.incidents[0].updates.len(), 2);
        assert_eq!(status.maintenances.len(), 1);
    }
}
