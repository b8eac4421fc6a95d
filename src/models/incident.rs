//! Incident entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "incidents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub organization_id: i32,

    pub service_id: i32,

    pub title: String,

    pub description: String,

    pub status: IncidentStatus,

    pub severity: Option<IncidentSeverity>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum IncidentStatus {
    #[sea_orm(string_value = "investigating")]
    #[serde(rename = "investigating")]
    Investigating,

    #[sea_orm(string_value = "identified")]
    #[serde(rename = "identified")]
    Identified,

    #[sea_orm(string_value = "resolved")]
    #[serde(rename = "resolved")]
    Resolved,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum IncidentSeverity {
    #[sea_orm(string_value = "critical")]
    #[serde(rename = "critical")]
    Critical,

    #[sea_orm(string_value = "high")]
    #[serde(rename = "high")]
    High,

    #[sea_orm(string_value = "medium")]
    #[serde(rename = "medium")]
    Medium,

    #[sea_orm(string_value = "low")]
    #[serde(rename = "low")]
    Low,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::service::Entity",
        from = "Column::ServiceId",
        to = "super::service::Column::Id"
    )]
    Service,
    #[sea_orm(has_many = "super::incident_update::Entity")]
    IncidentUpdate,
}

impl Related<super::service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl Related<super::incident_update::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IncidentUpdate.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
