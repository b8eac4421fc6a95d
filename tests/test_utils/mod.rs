//! Test utilities for database and router testing.
//!
//! Every helper works against an in-memory SQLite database with all
//! migrations applied. Fixtures go through the repositories so they obey the
//! same validation and ownership rules as the API.

#![allow(dead_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::Value;
use statuspage::{
    config::AppConfig,
    models::{
        incident, incident_update, maintenance, organization, organization_member, service,
    },
    repositories::{
        IncidentRepository, IncidentUpdateRepository, MaintenanceRepository, MemberRepository,
        OrganizationRepository, ServiceRepository, incident::IncidentDraft,
        maintenance::MaintenanceDraft, member::MemberDraft, organization::OrganizationDraft,
        service::ServiceDraft,
    },
    server::{AppState, create_app},
    webhook_verification::{
        ID_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER, compute_signature, decode_signing_secret,
    },
};
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

/// Tables that carry a `deleted_at` column, dependents first.
pub const SOFT_DELETE_TABLES: [&str; 6] = [
    "incident_updates",
    "incidents",
    "maintenances",
    "services",
    "organization_members",
    "organizations",
];

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Development-profile configuration with a known webhook secret and no
/// session-token key.
pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        database_url: "sqlite::memory:".to_string(),
        webhook_signing_secret: Some(WEBHOOK_SECRET.to_string()),
        ..AppConfig::default()
    }
}

pub fn test_app(db: DatabaseConnection) -> Result<Router> {
    test_app_with_config(db, test_config())
}

pub fn test_app_with_config(db: DatabaseConnection, config: AppConfig) -> Result<Router> {
    Ok(create_app(AppState::new(config, db)?))
}

/// Sends a request through the router and decodes the JSON body
/// (`Value::Null` when the body is empty).
pub async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Builds a webhook delivery signed with [`WEBHOOK_SECRET`] at the current time.
pub fn signed_webhook(msg_id: &str, body: &Value) -> Request<Body> {
    let payload = body.to_string();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
        .to_string();
    let key = decode_signing_secret(WEBHOOK_SECRET).unwrap();
    let signature = compute_signature(&key, msg_id, &timestamp, payload.as_bytes()).unwrap();

    Request::builder()
        .method("POST")
        .uri("/webhooks/provider")
        .header("content-type", "application/json")
        .header(ID_HEADER, msg_id)
        .header(TIMESTAMP_HEADER, timestamp)
        .header(SIGNATURE_HEADER, format!("v1,{signature}"))
        .body(Body::from(payload))
        .unwrap()
}

/// Number of rows in `table` whose `deleted_at` is null.
pub async fn live_count(db: &DatabaseConnection, table: &str) -> Result<i64> {
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            format!("SELECT COUNT(*) AS n FROM {table} WHERE deleted_at IS NULL"),
        ))
        .await?
        .ok_or_else(|| anyhow::anyhow!("count query returned no row"))?;
    Ok(row.try_get::<i64>("", "n")?)
}

/// Live row counts for every soft-deletable table, in [`SOFT_DELETE_TABLES`] order.
pub async fn live_counts(db: &DatabaseConnection) -> Result<Vec<i64>> {
    let mut counts = Vec::with_capacity(SOFT_DELETE_TABLES.len());
    for table in SOFT_DELETE_TABLES {
        counts.push(live_count(db, table).await?);
    }
    Ok(counts)
}

/// Makes every UPDATE on `table` abort, simulating a failing cascade step.
pub async fn fail_updates_on(db: &DatabaseConnection, table: &str) -> Result<()> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        format!(
            "CREATE TRIGGER fail_{table} BEFORE UPDATE ON {table} \
             BEGIN SELECT RAISE(ABORT, 'simulated failure'); END;"
        ),
    ))
    .await?;
    Ok(())
}

pub async fn create_organization(
    db: &DatabaseConnection,
    external_id: &str,
    slug: &str,
) -> Result<organization::Model> {
    let new = OrganizationDraft {
        external_id: Some(external_id.to_string()),
        name: Some(format!("{slug} org")),
        slug: Some(slug.to_string()),
    }
    .validate()?;
    Ok(OrganizationRepository::new(db).create(new).await?)
}

pub async fn create_service(
    db: &DatabaseConnection,
    org: &organization::Model,
    name: &str,
    status: &str,
) -> Result<service::Model> {
    let new = ServiceDraft {
        organization_id: Some(org.external_id.clone()),
        name: Some(name.to_string()),
        description: Some(format!("{name} service")),
        status: Some(status.to_string()),
        user_id: Some("user_test".to_string()),
    }
    .validate()?;
    Ok(ServiceRepository::new(db).create(org.id, new).await?)
}

pub async fn create_incident(
    db: &DatabaseConnection,
    org: &organization::Model,
    service: &service::Model,
    title: &str,
) -> Result<incident::Model> {
    let new = IncidentDraft {
        organization_id: Some(org.external_id.clone()),
        service_id: Some(service.id),
        title: Some(title.to_string()),
        description: Some(format!("{title} details")),
        status: Some("investigating".to_string()),
        severity: Some("high".to_string()),
    }
    .validate()?;
    Ok(IncidentRepository::new(db).create(org.id, new).await?)
}

pub async fn create_update(
    db: &DatabaseConnection,
    org: &organization::Model,
    incident: &incident::Model,
    message: &str,
) -> Result<incident_update::Model> {
    Ok(IncidentUpdateRepository::new(db)
        .create(org.id, incident.id, message.to_string())
        .await?)
}

pub async fn create_maintenance(
    db: &DatabaseConnection,
    org: &organization::Model,
    service: &service::Model,
    title: &str,
) -> Result<maintenance::Model> {
    let start = Utc::now() + Duration::hours(24);
    let new = MaintenanceDraft {
        organization_id: Some(org.external_id.clone()),
        service_id: Some(service.id),
        title: Some(title.to_string()),
        description: None,
        scheduled_start: Some(start.to_rfc3339()),
        scheduled_end: Some((start + Duration::hours(2)).to_rfc3339()),
        status: None,
    }
    .validate()?;
    Ok(MaintenanceRepository::new(db).create(org.id, new).await?)
}

pub async fn create_member(
    db: &DatabaseConnection,
    org: &organization::Model,
    user_id: &str,
) -> Result<organization_member::Model> {
    let new = MemberDraft {
        organization_id: Some(org.external_id.clone()),
        user_id: Some(user_id.to_string()),
        role: Some("member".to_string()),
    }
    .validate()?;
    Ok(MemberRepository::new(db).create(org.id, new).await?)
}

/// One organization with a row in every dependent table.
pub struct Fixture {
    pub org: organization::Model,
    pub service: service::Model,
    pub incident: incident::Model,
    pub update: incident_update::Model,
    pub maintenance: maintenance::Model,
    pub member: organization_member::Model,
}

pub async fn populated_organization(
    db: &DatabaseConnection,
    external_id: &str,
    slug: &str,
) -> Result<Fixture> {
    let org = create_organization(db, external_id, slug).await?;
    let service = create_service(db, &org, "API", "operational").await?;
    let incident = create_incident(db, &org, &service, "Outage").await?;
    let update = create_update(db, &org, &incident, "Investigating").await?;
    let maintenance = create_maintenance(db, &org, &service, "Upgrade").await?;
    let member = create_member(db, &org, "user_alice").await?;
    Ok(Fixture {
        org,
        service,
        incident,
        update,
        maintenance,
        member,
    })
}
