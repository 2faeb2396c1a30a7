//! Compact token decoding
//!
//! A compact token is `header.payload.signature`, each segment base64url
//! encoded.  [`decode`] checks the shape and turns the first two segments
//! into JSON; the signature is carried along untouched and is never verified
//! here.  Decoding says nothing about whether the claims can be trusted,
//! that is the job of [`validator`](super::validator).

use base64::Engine as _;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decoding failure for a compact token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    /// The token is not three non-empty segments of base64-encoded JSON, or
    /// its claims do not have the expected shape.
    #[error("invalid token format: {0}")]
    InvalidFormat(String),
}

// ---------------------------------------------------------------------------
// DecodedToken
// ---------------------------------------------------------------------------

/// Header and payload of a compact token, decoded but not verified.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    /// The JOSE header.
    pub header: serde_json::Value,
    /// The claims set.
    pub payload: serde_json::Value,
    /// The encoded signature segment, opaque to this crate.
    pub signature: String,
}

impl DecodedToken {
    /// The `alg` member of the header, when it is a string.
    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(serde_json::Value::as_str)
    }

    /// Deserializes the payload into a typed claims struct.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsError::InvalidFormat`] when required claims are missing
    /// or have the wrong JSON type.
    pub fn claims<T: DeserializeOwned>(&self) -> Result<T, ClaimsError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| ClaimsError::InvalidFormat(format!("unexpected claims: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Typed claims
// ---------------------------------------------------------------------------

/// The `aud` claim, which OIDC allows to be a single string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Whether `client_id` is (one of) the intended audience(s).
    pub fn contains(&self, client_id: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == client_id,
            Audience::Multiple(auds) => auds.iter().any(|aud| aud == client_id),
        }
    }
}

/// ID token claims this crate inspects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub iss: String,
    pub aud: Audience,
    /// Expiry, in seconds since the epoch.
    pub exp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// Access token claims this crate inspects; everything else is opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Expiry, in seconds since the epoch.
    pub exp: f64,
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// Decodes a compact token without verifying its signature.
///
/// # Errors
///
/// Returns [`ClaimsError::InvalidFormat`] when the token does not have
/// exactly three non-empty segments, when a segment is not base64, or when
/// the header or payload is not JSON.
///
/// # Examples
///
/// ```
/// use implicit_oidc::auth::claims::decode;
///
/// // {"alg":"RS256"} . {"exp":1}
/// let token = "eyJhbGciOiJSUzI1NiJ9.eyJleHAiOjF9.c2ln";
/// let decoded = decode(token).unwrap();
/// assert_eq!(decoded.algorithm(), Some("RS256"));
/// assert_eq!(decoded.payload["exp"], 1);
///
/// assert!(decode("only.two").is_err());
/// ```
pub fn decode(compact: &str) -> Result<DecodedToken, ClaimsError> {
    let segments: Vec<&str> = compact.split('.').collect();
    if segments.len() != 3 {
        return Err(ClaimsError::InvalidFormat(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(ClaimsError::InvalidFormat("empty segment".to_string()));
    }

    let header = decode_json_segment(segments[0], "header")?;
    let payload = decode_json_segment(segments[1], "payload")?;

    Ok(DecodedToken {
        header,
        payload,
        signature: segments[2].to_string(),
    })
}

/// Decodes one base64 segment, accepting both the URL-safe and the standard
/// alphabet, with or without padding.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, ClaimsError> {
    let normalized: String = segment
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(normalized.as_bytes())
        .map_err(|e| ClaimsError::InvalidFormat(format!("segment is not base64: {e}")))
}

/// `true` when an `exp` claim (seconds) is strictly after the current time,
/// compared at millisecond resolution.
pub fn expiry_in_future(exp: f64) -> bool {
    exp * 1000.0 > Utc::now().timestamp_millis() as f64
}

fn decode_json_segment(segment: &str, name: &str) -> Result<serde_json::Value, ClaimsError> {
    let bytes = decode_segment(segment)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ClaimsError::InvalidFormat(format!("{name} is not JSON: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
