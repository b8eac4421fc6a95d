//! Restricts slug uniqueness to live organizations so a deleted tenant's
//! public handle can be claimed again.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn execute(manager: &SchemaManager<'_>, sql: &str) -> Result<(), DbErr> {
    manager
        .get_connection()
        .execute(Statement::from_string(
            manager.get_database_backend(),
            sql.to_string(),
        ))
        .await
        .map(|_| ())
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        execute(manager, "DROP INDEX IF EXISTS idx_organizations_slug").await?;
        execute(
            manager,
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_organizations_live_slug \
             ON organizations (slug) \
             WHERE deleted_at IS NULL",
        )
        .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        execute(manager, "DROP INDEX IF EXISTS idx_organizations_live_slug").await?;
        execute(
            manager,
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_organizations_slug ON organizations (slug)",
        )
        .await
    }
}
