//! # Repository Layer
//!
//! Tenant-scoped data access over SeaORM. Every query filters on
//! `deleted_at IS NULL`; every tenant-owned query also filters on the internal
//! organization id produced by [`OrganizationRepository`].

use std::collections::BTreeMap;

use sea_orm::{ActiveEnum, DbErr};
use thiserror::Error;

pub mod incident;
pub mod incident_update;
pub mod maintenance;
pub mod member;
pub mod organization;
pub mod service;

pub use incident::IncidentRepository;
pub use incident_update::IncidentUpdateRepository;
pub use maintenance::MaintenanceRepository;
pub use member::MemberRepository;
pub use organization::OrganizationRepository;
pub use service::ServiceRepository;

/// Errors surfaced by repositories and the cascade coordinator.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    /// A transactional step failed; the transaction was rolled back.
    #[error("transaction rolled back: {0}")]
    Transaction(DbErr),
}

impl RepositoryError {
    pub fn not_found(what: &str) -> Self {
        RepositoryError::NotFound(format!("{what} not found"))
    }
}

/// Collects every violated field before reporting, so a client sees all of
/// them at once.
#[derive(Debug, Default)]
pub struct FieldErrors {
    fields: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    /// Returns the trimmed value, recording `field` as missing when absent or blank.
    pub fn require(&mut self, field: &str, value: Option<String>) -> Option<String> {
        match non_blank(value) {
            Some(value) => Some(value),
            None => {
                self.add(field, format!("{field} is required"));
                None
            }
        }
    }

    pub fn require_id(&mut self, field: &str, value: Option<i32>) -> Option<i32> {
        match value {
            Some(id) if id > 0 => Some(id),
            Some(_) => {
                self.add(field, format!("{field} must be a positive integer"));
                None
            }
            None => {
                self.add(field, format!("{field} is required"));
                None
            }
        }
    }

    /// Parses a string-backed enum, listing the accepted values on failure.
    pub fn parse_enum<E>(&mut self, field: &str, raw: &str) -> Option<E>
    where
        E: ActiveEnum<Value = String>,
    {
        match E::try_from_value(&raw.to_string()) {
            Ok(value) => Some(value),
            Err(_) => {
                let allowed: Vec<String> = E::iter().map(|v| v.to_value()).collect();
                self.add(
                    field,
                    format!("{field} must be one of: {}", allowed.join(", ")),
                );
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_result(self) -> Result<(), RepositoryError> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(RepositoryError::Validation {
                message: "Validation failed".to_string(),
                fields: self.fields,
            })
        }
    }
}

/// Trims and drops empty strings; partial updates treat blank as "unchanged".
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
