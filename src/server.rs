//! # Server Configuration
//!
//! Router assembly, middleware stack and the serve loop for the status page API.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{AuthError, SessionVerifier, session_auth_middleware};
use crate::config::AppConfig;
use crate::handlers::{
    self, incident_updates, incidents, maintenances, members, organizations, services, status,
    webhooks,
};
use crate::telemetry::trace_context_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub sessions: Arc<SessionVerifier>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Result<Self, AuthError> {
        let sessions = SessionVerifier::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            db,
            sessions: Arc::new(sessions),
        })
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let management = Router::new()
        .route(
            "/api/organizations/create",
            post(organizations::create_organization),
        )
        .route("/api/services/create", post(services::create_service))
        .route("/api/services/list", get(services::list_services))
        .route(
            "/api/services/{id}",
            put(services::update_service).delete(services::delete_service),
        )
        .route("/api/incidents/create", post(incidents::create_incident))
        .route("/api/incidents/list", get(incidents::list_incidents))
        .route("/api/incidents/update/{id}", put(incidents::update_incident))
        .route("/api/incidents/delete/{id}", delete(incidents::delete_incident))
        .route(
            "/api/incidents/{id}/updates",
            post(incident_updates::create_incident_update)
                .get(incident_updates::list_incident_updates),
        )
        .route(
            "/api/incidents/{id}/updates/{update_id}",
            delete(incident_updates::delete_incident_update),
        )
        .route(
            "/api/maintenances/create",
            post(maintenances::create_maintenance),
        )
        .route("/api/maintenances/list", get(maintenances::list_maintenances))
        .route("/api/maintenances/{id}", delete(maintenances::delete_maintenance))
        .route("/api/members/create", post(members::create_member))
        .route("/api/members/list", get(members::list_members))
        .route("/api/members/{id}", delete(members::delete_member))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_auth_middleware,
        ));

    let public = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route(
            "/api/organizations/list",
            get(organizations::list_organizations),
        )
        .route("/api/organizations/{slug}/status", get(status::get_status))
        .route("/webhooks/provider", post(webhooks::receive_provider_webhook));

    let cors = cors_layer(&state.config);

    public
        .merge(management)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(trace_context_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.cors_allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Starts the server and serves until SIGINT or SIGTERM
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .with_context(|| format!("Invalid server address: {}", config.api_bind_addr))?;
    let profile = config.profile.clone();

    let state = AppState::new(config, db).context("Failed to initialize session verification")?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (Ok(mut sigterm), Ok(mut sigint)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) else {
            tracing::warn!("Failed to register signal handlers; falling back to Ctrl-C");
            let _ = tokio::signal::ctrl_c().await;
            return;
        };

        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Shutdown signal received");
}

struct SessionSecurity;

impl Modify for SessionSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
        crate::handlers::organizations::create_organization,
        crate::handlers::organizations::list_organizations,
        crate::handlers::status::get_status,
        crate::handlers::services::create_service,
        crate::handlers::services::list_services,
        crate::handlers::services::update_service,
        crate::handlers::services::delete_service,
        crate::handlers::incidents::create_incident,
        crate::handlers::incidents::list_incidents,
        crate::handlers::incidents::update_incident,
        crate::handlers::incidents::delete_incident,
        crate::handlers::incident_updates::create_incident_update,
        crate::handlers::incident_updates::list_incident_updates,
        crate::handlers::incident_updates::delete_incident_update,
        crate::handlers::maintenances::create_maintenance,
        crate::handlers::maintenances::list_maintenances,
        crate::handlers::maintenances::delete_maintenance,
        crate::handlers::members::create_member,
        crate::handlers::members::list_members,
        crate::handlers::members::delete_member,
        crate::handlers::webhooks::receive_provider_webhook,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::service::ServiceStatus,
            crate::models::incident::IncidentStatus,
            crate::models::incident::IncidentSeverity,
            crate::models::maintenance::MaintenanceStatus,
            crate::models::organization_member::MemberRole,
            crate::error::ApiError,
            crate::handlers::HealthResponse,
            crate::handlers::types::MessageResponse,
            crate::handlers::types::OrganizationResponse,
            crate::handlers::types::ServiceResponse,
            crate::handlers::types::IncidentResponse,
            crate::handlers::types::IncidentUpdateResponse,
            crate::handlers::types::MaintenanceResponse,
            crate::handlers::types::MemberResponse,
            crate::handlers::status::StatusResponse,
            crate::handlers::status::StatusOrganization,
            crate::handlers::status::StatusIncident,
            crate::handlers::webhooks::WebhookEnvelope,
            crate::repositories::organization::OrganizationDraft,
            crate::repositories::service::ServiceDraft,
            crate::repositories::service::ServicePatch,
            crate::repositories::incident::IncidentDraft,
            crate::repositories::incident::IncidentPatch,
            crate::repositories::incident_update::IncidentUpdateDraft,
            crate::repositories::maintenance::MaintenanceDraft,
            crate::repositories::member::MemberDraft,
        )
    ),
    modifiers(&SessionSecurity),
    info(
        title = "Status Page API",
        description = "Multi-tenant status pages: services, incidents and maintenance windows",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
