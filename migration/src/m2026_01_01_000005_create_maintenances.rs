//! Migration to create the maintenances table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Maintenances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Maintenances::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Maintenances::OrganizationId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Maintenances::ServiceId).integer().not_null())
                    .col(ColumnDef::new(Maintenances::Title).text().not_null())
                    .col(
                        ColumnDef::new(Maintenances::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Maintenances::ScheduledStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Maintenances::ScheduledEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Maintenances::Status)
                            .text()
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(
                        ColumnDef::new(Maintenances::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Maintenances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Maintenances::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_maintenances_organization_id")
                            .from(Maintenances::Table, Maintenances::OrganizationId)
                            .to(Organizations::Table, Organizations::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_maintenances_service_id")
                            .from(Maintenances::Table, Maintenances::ServiceId)
                            .to(Services::Table, Services::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_maintenances_organization_service")
                    .table(Maintenances::Table)
                    .col(Maintenances::OrganizationId)
                    .col(Maintenances::ServiceId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_maintenances_organization_service")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Maintenances::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Maintenances {
    Table,
    Id,
    OrganizationId,
    ServiceId,
    Title,
    Description,
    ScheduledStart,
    ScheduledEnd,
    Status,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Services {
    Table,
    Id,
}
