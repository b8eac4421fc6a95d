//! Maintenance window entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "maintenances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub organization_id: i32,

    pub service_id: i32,

    pub title: String,

    pub description: String,

    pub scheduled_start: DateTimeWithTimeZone,

    /// Never earlier than `scheduled_start`
    pub scheduled_end: DateTimeWithTimeZone,

    pub status: MaintenanceStatus,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

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
pub enum MaintenanceStatus {
    #[sea_orm(string_value = "scheduled")]
    #[serde(rename = "scheduled")]
    #[default]
    Scheduled,

    #[sea_orm(string_value = "in_progress")]
    #[serde(rename = "in_progress")]
    InProgress,

    #[sea_orm(string_value = "completed")]
    #[serde(rename = "completed")]
    Completed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::service::Entity",
        from = "Column::ServiceId",
        to = "super::service::Column::Id"
    )]
    Service,
}

impl Related<super::service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
