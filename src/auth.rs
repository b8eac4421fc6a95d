//! # Session Authentication
//!
//! Management routes require a bearer session token issued by the identity
//! provider. Tokens are RS256 JWTs carrying the user id in `sub` and, when the
//! user has an active organization, its key in `org_id`.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;
use crate::error::{ApiError, not_found, unauthorized};
use crate::server::AppState;

/// Claims read from a verified session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity-provider user key
    pub sub: String,
    /// Active organization of the session, if any
    #[serde(default)]
    pub org_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Authorization header must use Bearer scheme")]
    InvalidScheme,
    #[error("Invalid session token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("invalid session public key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),
    #[error("session public key is not configured")]
    NotConfigured,
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        if let AuthError::InvalidToken(source) = &error {
            tracing::debug!(error = %source, "Rejected session token");
        }
        unauthorized(Some(&error.to_string()))
    }
}

/// The caller of a management request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Authenticated(SessionClaims),
    /// Development profiles without a configured key.
    Anonymous,
}

impl Session {
    pub fn org_claim(&self) -> Option<&str> {
        match self {
            Session::Authenticated(claims) => claims.org_id.as_deref(),
            Session::Anonymous => None,
        }
    }

    /// User of an authenticated session that carries no organization claim.
    pub fn unscoped_user(&self) -> Option<&str> {
        match self {
            Session::Authenticated(claims) if claims.org_id.is_none() => Some(&claims.sub),
            _ => None,
        }
    }

    /// A session bound to one organization may only address that organization.
    /// Mismatches look exactly like an unknown organization.
    pub fn ensure_org_access(&self, external_id: &str) -> Result<(), ApiError> {
        match self.org_claim() {
            Some(claimed) if claimed != external_id => {
                tracing::warn!(
                    claimed_org = claimed,
                    requested_org = external_id,
                    "Session organization does not match request"
                );
                Err(not_found("Organization not found"))
            }
            _ => Ok(()),
        }
    }
}

/// Verifies session tokens against the configured public key.
pub struct SessionVerifier {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier")
            .field("configured", &self.key.is_some())
            .finish()
    }
}

impl SessionVerifier {
    pub fn from_config(config: &AppConfig) -> Result<Self, AuthError> {
        let key = match config.auth_jwt_public_key.as_deref() {
            Some(pem) => {
                Some(DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(AuthError::InvalidKey)?)
            }
            None if config.is_development_profile() => {
                tracing::warn!(
                    profile = %config.profile,
                    "No session public key configured; management routes accept unauthenticated requests"
                );
                None
            }
            None => return Err(AuthError::NotConfigured),
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        validation.leeway = 60;
        if let Some(issuer) = &config.auth_jwt_issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self { key, validation })
    }

    pub fn verify(&self, headers: &HeaderMap) -> Result<Session, AuthError> {
        let Some(key) = &self.key else {
            return Ok(Session::Anonymous);
        };

        let token = bearer_token(headers)?;
        let data = decode::<SessionClaims>(token, key, &self.validation)
            .map_err(AuthError::InvalidToken)?;
        Ok(Session::Authenticated(data.claims))
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidScheme)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidScheme)
}

impl FromRef<AppState> for Arc<SessionVerifier> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.sessions)
    }
}

/// Rejects management requests without a valid session and stores the
/// [`Session`] for handlers.
pub async fn session_auth_middleware(
    State(verifier): State<Arc<SessionVerifier>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = verifier.verify(request.headers())?;
    if let Session::Authenticated(claims) = &session {
        tracing::debug!(user_id = %claims.sub, org_id = ?claims.org_id, "Authenticated session");
    }

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for Session
where
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("Authentication required")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const PRIVATE_PEM: &str = include_str!("../tests/fixtures/session_private.pem");
    const PUBLIC_PEM: &str = include_str!("../tests/fixtures/session_public.pem");

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        org_id: Option<&'a str>,
        iss: &'a str,
        exp: u64,
    }

    fn token(org_id: Option<&str>, iss: &str) -> String {
        let exp = (chrono::Utc::now().timestamp() + 600) as u64;
        encode(
            &Header::new(Algorithm::RS256),
            &TestClaims {
                sub: "user_1",
                org_id,
                iss,
                exp,
            },
            &EncodingKey::from_rsa_pem(PRIVATE_PEM.as_bytes()).unwrap(),
        )
        .unwrap()
    }

    fn headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    fn verifier(profile: &str, issuer: Option<&str>) -> SessionVerifier {
        SessionVerifier::from_config(&AppConfig {
            profile: profile.to_string(),
            auth_jwt_public_key: Some(PUBLIC_PEM.to_string()),
            auth_jwt_issuer: issuer.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn accepts_valid_token_and_reads_claims() {
        let session = verifier("prod", Some("https://id.example"))
            .verify(&headers(&token(Some("org_acme"), "https://id.example")))
            .unwrap();

        assert_eq!(
            session,
            Session::Authenticated(SessionClaims {
                sub: "user_1".into(),
                org_id: Some("org_acme".into()),
            })
        );
    }

    #[test]
    fn rejects_wrong_issuer_and_garbage() {
        let verifier = verifier("prod", Some("https://id.example"));
        assert!(matches!(
            verifier.verify(&headers(&token(None, "https://evil.example"))),
            Err(AuthError::InvalidToken(_))
        ));
        assert!(matches!(
            verifier.verify(&headers("not-a-jwt")),
            Err(AuthError::InvalidToken(_))
        ));
        assert!(matches!(
            verifier.verify(&HeaderMap::new()),
            Err(AuthError::MissingHeader)
        ));
    }

    #[test]
    fn missing_key_only_allowed_in_development() {
        let local = SessionVerifier::from_config(&AppConfig {
            profile: "local".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(local.verify(&HeaderMap::new()).unwrap(), Session::Anonymous);

        let prod = SessionVerifier::from_config(&AppConfig {
            profile: "prod".into(),
            ..Default::default()
        });
        assert!(matches!(prod, Err(AuthError::NotConfigured)));
    }

    #[test]
    fn org_claim_mismatch_is_not_found() {
        let session = Session::Authenticated(SessionClaims {
            sub: "user_1".into(),
            org_id: Some("org_acme".into()),
        });
        assert!(session.ensure_org_access("org_acme").is_ok());

        let err = session.ensure_org_access("org_other").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);

        assert!(Session::Anonymous.ensure_org_access("org_other").is_ok());
    }

    #[test]
    fn only_sessions_without_org_claim_are_unscoped() {
        let unscoped = Session::Authenticated(SessionClaims {
            sub: "user_1".into(),
            org_id: None,
        });
        assert_eq!(unscoped.unscoped_user(), Some("user_1"));

        let scoped = Session::Authenticated(SessionClaims {
            sub: "user_1".into(),
            org_id: Some("org_acme".into()),
        });
        assert_eq!(scoped.unscoped_user(), None);
        assert_eq!(Session::Anonymous.unscoped_user(), None);
    }
}
