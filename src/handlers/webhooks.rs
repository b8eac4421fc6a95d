//! # Identity-Provider Webhook Handler
//!
//! Mirrors organization lifecycle events into the local `organizations` table.
//! The signature is checked against the raw body before anything is parsed;
//! an unverified delivery never reaches the database.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::cascade::CascadeCoordinator;
use crate::error::{ApiError, bad_request, internal_error, is_unique_violation, unauthorized};
use crate::handlers::types::MessageResponse;
use crate::repositories::{
    FieldErrors, OrganizationRepository, RepositoryError, organization::OrganizationDraft,
};
use crate::server::AppState;
use crate::webhook_verification::verify_webhook;

const ORGANIZATION_EVENT_PREFIX: &str = "organization.";

/// Event envelope delivered by the identity provider
#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookEnvelope {
    /// Event type, e.g. `organization.created`
    #[serde(rename = "type")]
    #[schema(example = "organization.created")]
    pub event_type: String,
    #[serde(default)]
    pub data: JsonValue,
}

/// Organization fields carried in `data`
#[derive(Debug, Default, Deserialize)]
struct OrganizationEventData {
    id: Option<String>,
    name: Option<String>,
    slug: Option<String>,
}

impl From<OrganizationEventData> for OrganizationDraft {
    fn from(data: OrganizationEventData) -> Self {
        OrganizationDraft {
            external_id: data.id,
            name: data.name,
            slug: data.slug,
        }
    }
}

/// Receive an identity-provider webhook
#[utoipa::path(
    post,
    path = "/webhooks/provider",
    params(
        ("svix-id" = String, Header, description = "Message id"),
        ("svix-timestamp" = String, Header, description = "Unix timestamp of the delivery"),
        ("svix-signature" = String, Header, description = "Space-separated `v1,<base64>` signatures")
    ),
    request_body(content = WebhookEnvelope, content_type = "application/json"),
    responses(
        (status = 200, description = "Event applied or acknowledged", body = MessageResponse),
        (status = 400, description = "Malformed envelope or organization data", body = ApiError),
        (status = 401, description = "Missing or invalid signature", body = ApiError),
        (status = 404, description = "Updated organization is not mirrored", body = ApiError),
        (status = 409, description = "Slug belongs to another live organization", body = ApiError),
        (status = 500, description = "Database failure", body = ApiError)
    ),
    tag = "webhooks"
)]
pub async fn receive_provider_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    verify_webhook(
        &headers,
        &body,
        state.config.webhook_signing_secret.as_deref(),
        state.config.webhook_tolerance_seconds,
    )
    .map_err(|err| {
        warn!(error = %err, "Rejected webhook delivery");
        unauthorized(Some("Invalid webhook signature"))
    })?;

    let envelope: WebhookEnvelope = serde_json::from_slice(&body)
        .map_err(|err| bad_request(&format!("Invalid webhook payload: {err}")))?;

    let event_type = envelope.event_type.as_str();
    if !event_type.starts_with(ORGANIZATION_EVENT_PREFIX) {
        debug!(event_type, "Ignoring non-organization event");
        return Ok(acknowledge("Ignored non-organization event"));
    }

    let data: OrganizationEventData = serde_json::from_value(envelope.data)
        .map_err(|err| bad_request(&format!("Invalid organization data: {err}")))?;

    let repo = OrganizationRepository::new(&state.db);
    match event_type {
        "organization.created" => {
            let new = OrganizationDraft::from(data).validate()?;
            let organization = repo
                .upsert_from_provider(new)
                .await
                .map_err(webhook_failure)?;
            info!(
                event_type,
                organization_id = organization.id,
                external_id = %organization.external_id,
                "Organization mirrored"
            );
            Ok(acknowledge("Organization created"))
        }
        "organization.updated" => {
            let new = OrganizationDraft::from(data).validate()?;
            let organization = repo
                .update_from_provider(new)
                .await
                .map_err(webhook_failure)?;
            info!(event_type, organization_id = organization.id, "Organization updated");
            Ok(acknowledge("Organization updated"))
        }
        "organization.deleted" => {
            let mut errors = FieldErrors::new();
            let external_id = errors.require("id", data.id);
            errors.into_result()?;
            let external_id = external_id.unwrap_or_default();

            let Some(organization) = repo
                .find_live_by_external_id(&external_id)
                .await
                .map_err(webhook_failure)?
            else {
                info!(event_type, external_id = %external_id, "Organization already absent");
                return Ok(acknowledge("Organization already deleted"));
            };

            let report = match CascadeCoordinator::new(&state.db)
                .delete_organization(organization.id)
                .await
            {
                Ok(report) => report,
                Err(RepositoryError::NotFound(_)) => {
                    return Ok(acknowledge("Organization already deleted"));
                }
                Err(err) => return Err(webhook_failure(err)),
            };
            info!(
                event_type,
                organization_id = organization.id,
                services = report.services,
                incidents = report.incidents,
                "Organization removed"
            );
            Ok(acknowledge("Organization deleted"))
        }
        _ => {
            debug!(event_type, "Acknowledging unhandled organization event");
            Ok(acknowledge("Event acknowledged"))
        }
    }
}

fn acknowledge(message: &str) -> (StatusCode, Json<MessageResponse>) {
    (StatusCode::OK, Json(MessageResponse::new(message)))
}

/// Store failures during mirroring are internal; resolution misses stay 404
/// and a slug held by another live organization is 409.
fn webhook_failure(error: RepositoryError) -> ApiError {
    match error {
        RepositoryError::NotFound(_)
        | RepositoryError::Validation { .. }
        | RepositoryError::Conflict(_) => error.into(),
        RepositoryError::Database(db_err) if is_unique_violation(&db_err) => {
            warn!(error = %db_err, "Organization slug already taken");
            db_err.into()
        }
        other => {
            error!(error = %other, "Failed to apply webhook event");
            internal_error()
        }
    }
}
