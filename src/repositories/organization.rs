//! # Organization Repository (tenant resolver)
//!
//! Maps client-facing organization keys onto internal ids. Tenant-scoped
//! operations resolve first and only ever use the returned internal id.

use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{FieldErrors, RepositoryError};
use crate::models::organization::{
    ActiveModel as OrganizationActiveModel, Column, Entity as Organization,
    Model as OrganizationModel,
};

const SLUG_PATTERN: &str = r"^[a-z0-9]+(?:-[a-z0-9]+)*$";
const MAX_SLUG_LEN: usize = 64;
const MAX_NAME_LEN: usize = 255;

fn slug_regex() -> &'static Regex {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    SLUG.get_or_init(|| Regex::new(SLUG_PATTERN).expect("slug pattern compiles"))
}

/// Raw organization payload (API create and webhook mirror).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct OrganizationDraft {
    /// Identity-provider organization key
    #[schema(example = "org_2fDz8sLk9PZJmRnQ4tGbWALeExi")]
    pub external_id: Option<String>,
    #[schema(example = "Acme Inc")]
    pub name: Option<String>,
    /// Lowercase letters, digits and single dashes
    #[schema(example = "acme")]
    pub slug: Option<String>,
}

/// Validated organization fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrganization {
    pub external_id: String,
    pub name: String,
    pub slug: String,
}

impl OrganizationDraft {
    pub fn validate(self) -> Result<NewOrganization, RepositoryError> {
        let mut errors = FieldErrors::new();
        let external_id = errors.require("external_id", self.external_id);
        let name = errors.require("name", self.name);
        let slug = errors.require("slug", self.slug);

        if let Some(name) = &name
            && name.chars().count() > MAX_NAME_LEN
        {
            errors.add("name", format!("name cannot exceed {MAX_NAME_LEN} characters"));
        }
        if let Some(slug) = &slug
            && (slug.len() > MAX_SLUG_LEN || !slug_regex().is_match(slug))
        {
            errors.add(
                "slug",
                format!(
                    "slug must be 1-{MAX_SLUG_LEN} lowercase letters, digits or single dashes"
                ),
            );
        }
        errors.into_result()?;

        Ok(NewOrganization {
            external_id: external_id.unwrap_or_default(),
            name: name.unwrap_or_default(),
            slug: slug.unwrap_or_default(),
        })
    }
}

pub struct OrganizationRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> OrganizationRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Resolve an identity-provider key to the internal id of a live organization.
    pub async fn resolve_external(&self, external_id: &str) -> Result<i32, RepositoryError> {
        self.find_live_by_external_id(external_id)
            .await?
            .map(|org| org.id)
            .ok_or_else(|| RepositoryError::not_found("Organization"))
    }

    /// Resolve a public slug to a live organization.
    pub async fn resolve_slug(&self, slug: &str) -> Result<OrganizationModel, RepositoryError> {
        Organization::find()
            .filter(Column::Slug.eq(slug))
            .filter(Column::DeletedAt.is_null())
            .one(self.db)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Organization"))
    }

    pub async fn find_live_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<OrganizationModel>, RepositoryError> {
        Ok(Organization::find()
            .filter(Column::ExternalId.eq(external_id))
            .filter(Column::DeletedAt.is_null())
            .one(self.db)
            .await?)
    }

    /// All live organizations in insertion order.
    pub async fn list(&self) -> Result<Vec<OrganizationModel>, RepositoryError> {
        Ok(Organization::find()
            .filter(Column::DeletedAt.is_null())
            .order_by_asc(Column::Id)
            .all(self.db)
            .await?)
    }

    pub async fn create(
        &self,
        new: NewOrganization,
    ) -> Result<OrganizationModel, RepositoryError> {
        let now = Utc::now().fixed_offset();

        let organization = OrganizationActiveModel {
            external_id: Set(new.external_id),
            name: Set(new.name),
            slug: Set(new.slug),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        };

        Ok(organization.insert(self.db).await?)
    }

    /// Mirror an `organization.created` event. A redelivered key overwrites
    /// name and slug, reviving the row if it had been deleted.
    pub async fn upsert_from_provider(
        &self,
        new: NewOrganization,
    ) -> Result<OrganizationModel, RepositoryError> {
        let existing = Organization::find()
            .filter(Column::ExternalId.eq(new.external_id.as_str()))
            .one(self.db)
            .await?;

        match existing {
            Some(organization) => {
                let mut active = organization.into_active_model();
                active.name = Set(new.name);
                active.slug = Set(new.slug);
                active.updated_at = Set(Utc::now().fixed_offset());
                active.deleted_at = Set(None);
                Ok(active.update(self.db).await?)
            }
            None => self.create(new).await,
        }
    }

    /// Mirror an `organization.updated` event onto the live row.
    pub async fn update_from_provider(
        &self,
        new: NewOrganization,
    ) -> Result<OrganizationModel, RepositoryError> {
        let organization = self
            .find_live_by_external_id(&new.external_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Organization"))?;

        let mut active = organization.into_active_model();
        active.name = Set(new.name);
        active.slug = Set(new.slug);
        active.updated_at = Set(Utc::now().fixed_offset());
        Ok(active.update(self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    fn acme() -> NewOrganization {
        NewOrganization {
            external_id: "org_acme".into(),
            name: "Acme".into(),
            slug: "acme".into(),
        }
    }

    #[test]
    fn draft_validation_reports_all_fields() {
        let err = OrganizationDraft {
            external_id: None,
            name: Some(" ".into()),
            slug: Some("Not A Slug".into()),
        }
        .validate()
        .unwrap_err();

        match err {
            RepositoryError::Validation { fields, .. } => {
                assert!(fields.contains_key("external_id"));
                assert!(fields.contains_key("name"));
                assert!(fields["slug"].contains("lowercase"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn resolves_only_live_organizations() {
        let db = setup_db().await;
        let repo = OrganizationRepository::new(&db);
        let org = repo.create(acme()).await.unwrap();

        assert_eq!(repo.resolve_external("org_acme").await.unwrap(), org.id);
        assert_eq!(repo.resolve_slug("acme").await.unwrap().id, org.id);
        assert!(matches!(
            repo.resolve_external("org_missing").await,
            Err(RepositoryError::NotFound(_))
        ));

        let mut active = org.into_active_model();
        active.deleted_at = Set(Some(Utc::now().fixed_offset()));
        active.update(&db).await.unwrap();

        assert!(repo.resolve_external("org_acme").await.is_err());
        assert!(repo.resolve_slug("acme").await.is_err());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_revives_deleted_row() {
        let db = setup_db().await;
        let repo = OrganizationRepository::new(&db);
        let org = repo.create(acme()).await.unwrap();

        let mut active = org.clone().into_active_model();
        active.deleted_at = Set(Some(Utc::now().fixed_offset()));
        active.update(&db).await.unwrap();

        let revived = repo
            .upsert_from_provider(NewOrganization {
                name: "Acme Reborn".into(),
                ..acme()
            })
            .await
            .unwrap();

        assert_eq!(revived.id, org.id);
        assert_eq!(revived.name, "Acme Reborn");
        assert!(revived.deleted_at.is_none());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_from_provider_requires_live_row() {
        let db = setup_db().await;
        let repo = OrganizationRepository::new(&db);

        let missing = repo.update_from_provider(acme()).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound(_))));

        repo.create(acme()).await.unwrap();
        let updated = repo
            .update_from_provider(NewOrganization {
                slug: "acme-corp".into(),
                ..acme()
            })
            .await
            .unwrap();
        assert_eq!(updated.slug, "acme-corp");
    }
}
