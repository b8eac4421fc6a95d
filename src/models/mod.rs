//! # Data Models
//!
//! SeaORM entities for the status page tables. Every entity carries a
//! nullable `deleted_at`; a row is live only while it is `NULL`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod incident;
pub mod incident_update;
pub mod maintenance;
pub mod organization;
pub mod organization_member;
pub mod service;

pub use incident::Entity as Incident;
pub use incident_update::Entity as IncidentUpdate;
pub use maintenance::Entity as Maintenance;
pub use organization::Entity as Organization;
pub use organization_member::Entity as OrganizationMember;
pub use service::Entity as Service;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "statuspage".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
