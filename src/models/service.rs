//! Service entity model
//!
//! A service is a system component whose health is shown on the status page.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub organization_id: i32,

    pub name: String,

    pub description: String,

    pub status: ServiceStatus,

    /// Identity-provider user key of the creator
    pub user_id: String,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

/// Operational state of a service, ordered from healthy to worst.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ServiceStatus {
    #[sea_orm(string_value = "operational")]
    #[serde(rename = "operational")]
    #[default]
    Operational,

    #[sea_orm(string_value = "degraded_performance")]
    #[serde(rename = "degraded_performance")]
    DegradedPerformance,

    #[sea_orm(string_value = "partial_outage")]
    #[serde(rename = "partial_outage")]
    PartialOutage,

    #[sea_orm(string_value = "major_outage")]
    #[serde(rename = "major_outage")]
    MajorOutage,
}

impl ServiceStatus {
    /// Rank used to compute the overall page status; higher is worse.
    pub fn severity_rank(self) -> u8 {
        match self {
            ServiceStatus::Operational => 0,
            ServiceStatus::DegradedPerformance => 1,
            ServiceStatus::PartialOutage => 2,
            ServiceStatus::MajorOutage => 3,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id"
    )]
    Organization,
    #[sea_orm(has_many = "super::incident::Entity")]
    Incident,
    #[sea_orm(has_many = "super::maintenance::Entity")]
    Maintenance,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::incident::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Incident.def()
    }
}

impl Related<super::maintenance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Maintenance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ActiveEnum, Iterable};

    #[test]
    fn status_round_trips_through_string_value() {
        for status in ServiceStatus::iter() {
            let value = status.to_value();
            assert_eq!(ServiceStatus::try_from_value(&value).unwrap(), status);
        }
        assert!(ServiceStatus::try_from_value(&"down".to_string()).is_err());
    }

    #[test]
    fn severity_rank_orders_outages_last() {
        assert!(
            ServiceStatus::MajorOutage.severity_rank()
                > ServiceStatus::PartialOutage.severity_rank()
        );
        assert!(
            ServiceStatus::DegradedPerformance.severity_rank()
                > ServiceStatus::Operational.severity_rank()
        );
    }
}
