//! # Member Repository
//!
//! Local record of which identity-provider users belong to an organization.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::Expr,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{FieldErrors, RepositoryError};
use crate::models::organization_member::{
    ActiveModel as MemberActiveModel, Column, Entity as OrganizationMember, MemberRole,
    Model as MemberModel,
};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct MemberDraft {
    /// Identity-provider organization key
    #[schema(example = "org_acme")]
    pub organization_id: Option<String>,
    #[schema(example = "user_2abc")]
    pub user_id: Option<String>,
    /// One of admin, member
    #[schema(example = "member")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub organization_id: String,
    pub user_id: String,
    pub role: MemberRole,
}

impl MemberDraft {
    pub fn validate(self) -> Result<NewMember, RepositoryError> {
        let mut errors = FieldErrors::new();
        let organization_id = errors.require("organization_id", self.organization_id);
        let user_id = errors.require("user_id", self.user_id);
        let role = errors
            .require("role", self.role)
            .and_then(|raw| errors.parse_enum::<MemberRole>("role", &raw));
        errors.into_result()?;

        Ok(NewMember {
            organization_id: organization_id.unwrap_or_default(),
            user_id: user_id.unwrap_or_default(),
            role: role.unwrap_or(MemberRole::Member),
        })
    }
}

pub struct MemberRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> MemberRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Adds a membership; a user has at most one live membership per organization.
    pub async fn create(
        &self,
        organization_id: i32,
        new: NewMember,
    ) -> Result<MemberModel, RepositoryError> {
        if self.is_member(organization_id, &new.user_id).await? {
            return Err(RepositoryError::Conflict(
                "User is already a member of this organization".to_string(),
            ));
        }

        let now = Utc::now().fixed_offset();
        let member = MemberActiveModel {
            organization_id: Set(organization_id),
            user_id: Set(new.user_id),
            role: Set(new.role),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        };

        Ok(member.insert(self.db).await?)
    }

    /// Whether `user_id` holds a live membership in the organization.
    pub async fn is_member(
        &self,
        organization_id: i32,
        user_id: &str,
    ) -> Result<bool, RepositoryError> {
        let membership = OrganizationMember::find()
            .filter(Column::OrganizationId.eq(organization_id))
            .filter(Column::UserId.eq(user_id))
            .filter(Column::DeletedAt.is_null())
            .one(self.db)
            .await?;
        Ok(membership.is_some())
    }

    pub async fn list(&self, organization_id: i32) -> Result<Vec<MemberModel>, RepositoryError> {
        Ok(OrganizationMember::find()
            .filter(Column::OrganizationId.eq(organization_id))
            .filter(Column::DeletedAt.is_null())
            .order_by_asc(Column::Id)
            .all(self.db)
            .await?)
    }

    pub async fn delete(&self, organization_id: i32, member_id: i32) -> Result<(), RepositoryError> {
        let now = Utc::now().fixed_offset();
        let result = OrganizationMember::update_many()
            .col_expr(Column::DeletedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(member_id))
            .filter(Column::OrganizationId.eq(organization_id))
            .filter(Column::DeletedAt.is_null())
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("Member"));
        }
        Ok(())
    }
}
