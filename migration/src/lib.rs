//! Database migrations for the status page service.
//!
//! Tables are created parent first so that foreign keys always point at an
//! existing table; `down` runs in reverse.

pub use sea_orm_migration::prelude::*;

mod m2026_01_01_000001_create_organizations;
mod m2026_01_01_000002_create_services;
mod m2026_01_01_000003_create_incidents;
mod m2026_01_01_000004_create_incident_updates;
mod m2026_01_01_000005_create_maintenances;
mod m2026_01_01_000006_create_organization_members;
mod m2026_01_02_000001_partial_organization_slug_index;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_01_000001_create_organizations::Migration),
            Box::new(m2026_01_01_000002_create_services::Migration),
            Box::new(m2026_01_01_000003_create_incidents::Migration),
            Box::new(m2026_01_01_000004_create_incident_updates::Migration),
            Box::new(m2026_01_01_000005_create_maintenances::Migration),
            Box::new(m2026_01_01_000006_create_organization_members::Migration),
            Box::new(m2026_01_02_000001_partial_organization_slug_index::Migration),
        ]
    }
}
