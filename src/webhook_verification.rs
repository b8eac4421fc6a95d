//! # Webhook Signature Verification
//!
//! Verifies identity-provider webhooks signed with the Svix scheme:
//! `base64(HMAC-SHA256(secret, "{svix-id}.{svix-timestamp}.{body}"))`, where the
//! secret is the base64 payload of a `whsec_` key and `svix-signature` holds a
//! space-separated list of `v1,<signature>` entries. Comparison is constant
//! time and the timestamp must sit inside the tolerance window.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

pub const ID_HEADER: &str = "svix-id";
pub const TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const SIGNATURE_HEADER: &str = "svix-signature";

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// Errors that can occur during webhook signature verification
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Missing required header: {header}")]
    MissingHeader { header: &'static str },

    #[error("Invalid signature format: {reason}")]
    InvalidSignatureFormat { reason: String },

    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Invalid timestamp format: {header}")]
    InvalidTimestamp { header: &'static str },

    #[error("Timestamp too old: {seconds}s old, max allowed: {max_seconds}s")]
    TimestampTooOld { seconds: u64, max_seconds: u64 },

    #[error("Timestamp too far in future: {seconds}s in future, max allowed: {max_seconds}s")]
    TimestampTooFuture { seconds: u64, max_seconds: u64 },

    #[error("Webhook signing secret is not configured")]
    NotConfigured,

    #[error("Webhook signing secret is malformed")]
    InvalidSecret,
}

pub type VerificationResult<T> = Result<T, VerificationError>;

/// Decodes a `whsec_<base64>` (or bare base64) secret into key bytes.
pub fn decode_signing_secret(secret: &str) -> VerificationResult<Vec<u8>> {
    let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
    let key = STANDARD
        .decode(encoded.trim())
        .map_err(|_| VerificationError::InvalidSecret)?;
    if key.is_empty() {
        return Err(VerificationError::InvalidSecret);
    }
    Ok(key)
}

fn signature_bytes(
    key: &[u8],
    msg_id: &str,
    timestamp: &str,
    body: &[u8],
) -> VerificationResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| VerificationError::InvalidSecret)?;
    mac.update(msg_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Computes the base64 `v1` signature for a message.
pub fn compute_signature(
    key: &[u8],
    msg_id: &str,
    timestamp: &str,
    body: &[u8],
) -> VerificationResult<String> {
    signature_bytes(key, msg_id, timestamp, body).map(|mac| STANDARD.encode(mac))
}

/// Verifies a delivery against the configured secret using the current clock.
pub fn verify_webhook(
    headers: &HeaderMap,
    body: &[u8],
    secret: Option<&str>,
    tolerance_seconds: u64,
) -> VerificationResult<()> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| VerificationError::InvalidTimestamp {
            header: TIMESTAMP_HEADER,
        })?
        .as_secs();
    verify_webhook_at(headers, body, secret, tolerance_seconds, now)
}

/// Verifies a delivery as of `now` (Unix seconds).
pub fn verify_webhook_at(
    headers: &HeaderMap,
    body: &[u8],
    secret: Option<&str>,
    tolerance_seconds: u64,
    now: u64,
) -> VerificationResult<()> {
    let secret = secret
        .filter(|s| !s.trim().is_empty())
        .ok_or(VerificationError::NotConfigured)?;
    let key = decode_signing_secret(secret)?;

    let msg_id = header_value(headers, ID_HEADER)?;
    let timestamp_raw = header_value(headers, TIMESTAMP_HEADER)?;
    let signatures = header_value(headers, SIGNATURE_HEADER)?;

    debug!(
        body_size = body.len(),
        tolerance_seconds, "Starting webhook signature verification"
    );

    let timestamp = timestamp_raw
        .parse::<u64>()
        .map_err(|_| VerificationError::InvalidTimestamp {
            header: TIMESTAMP_HEADER,
        })?;

    let time_diff = now.abs_diff(timestamp);
    if time_diff > tolerance_seconds {
        return Err(if now > timestamp {
            VerificationError::TimestampTooOld {
                seconds: time_diff,
                max_seconds: tolerance_seconds,
            }
        } else {
            VerificationError::TimestampTooFuture {
                seconds: time_diff,
                max_seconds: tolerance_seconds,
            }
        });
    }

    let expected = signature_bytes(&key, msg_id, timestamp_raw, body)?;

    let mut saw_versioned_entry = false;
    for entry in signatures.split_whitespace() {
        let Some((version, encoded)) = entry.split_once(',') else {
            continue;
        };
        if version != SIGNATURE_VERSION {
            continue;
        }
        saw_versioned_entry = true;

        let Ok(provided) = STANDARD.decode(encoded) else {
            continue;
        };
        if expected.as_slice().ct_eq(provided.as_slice()).into() {
            return Ok(());
        }
    }

    if saw_versioned_entry {
        Err(VerificationError::VerificationFailed)
    } else {
        Err(VerificationError::InvalidSignatureFormat {
            reason: format!("{SIGNATURE_HEADER} has no {SIGNATURE_VERSION} entries"),
        })
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &'static str) -> VerificationResult<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(VerificationError::MissingHeader { header: name })
}
