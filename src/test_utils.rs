//! Test utilities for implicit-oidc
//!
//! Builders for compact tokens shaped like real ones (header, payload and a
//! dummy signature), a matching discovery document, and a canned
//! [`DiscoveryFetcher`].

use async_trait::async_trait;
use base64::Engine as _;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::discovery::{DiscoveryFetcher, ServerConfig};
use crate::auth::validator::{compute_at_hash, HashAlphabet};
use crate::config::ClientConfig;
use crate::error::{OidcError, Result};

/// Client id every test token is issued to.
pub const TEST_CLIENT_ID: &str = "test-client";

/// Issuer every test token and discovery document names.
pub const TEST_ISSUER: &str = "https://auth.example.com";

/// Base64url-encodes (unpadded) the JSON serialization of `value`.
pub fn encode_segment(value: &Value) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(value.to_string())
}

/// Assembles `header.payload.signature` with a fixed dummy signature.
pub fn make_token(header: &Value, payload: &Value) -> String {
    format!(
        "{}.{}.{}",
        encode_segment(header),
        encode_segment(payload),
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("signature")
    )
}

/// An access token expiring at `exp` (seconds since the epoch).
pub fn make_access_token(exp: i64) -> String {
    make_token(
        &json!({"alg": "RS256", "typ": "JWT"}),
        &json!({"exp": exp, "scope": "openid", "sub": "alice"}),
    )
}

/// An RS256 ID token bound to `access_token` that passes validation against
/// [`server_config`].
///
/// `overrides` is merged over the default claims; a `null` value removes
/// the claim.
pub fn id_token_for(access_token: &str, overrides: Value) -> String {
    let mut claims = json!({
        "iss": TEST_ISSUER,
        "aud": TEST_CLIENT_ID,
        "sub": "alice",
        "exp": Utc::now().timestamp() + 3600,
        "at_hash": compute_at_hash(access_token, "RS256", HashAlphabet::UrlSafeNoPad),
    });

    if let (Some(target), Value::Object(changes)) = (claims.as_object_mut(), overrides) {
        for (key, value) in changes {
            if value.is_null() {
                target.remove(&key);
            } else {
                target.insert(key, value);
            }
        }
    }

    make_token(&json!({"alg": "RS256", "typ": "JWT"}), &claims)
}

/// Discovery document for [`TEST_ISSUER`] advertising RS256.
pub fn server_config() -> ServerConfig {
    ServerConfig {
        issuer: TEST_ISSUER.to_string(),
        id_token_encryption_alg_values_supported: vec!["RS256".to_string()],
        extra: HashMap::new(),
    }
}

/// Client configuration issued to [`TEST_CLIENT_ID`].
pub fn test_client_config() -> ClientConfig {
    ClientConfig {
        authorization_url: "https://auth.example.com/oauth/authorize".to_string(),
        client_id: TEST_CLIENT_ID.to_string(),
        redirect_url: "http://localhost:7000?authorizing=true".to_string(),
        discovery_url: "https://auth.example.com/.well-known/openid-configuration".to_string(),
    }
}

/// Redirect fragment carrying both tokens.
pub fn callback_fragment(access_token: &str, id_token: &str) -> String {
    format!("access_token={access_token}&id_token={id_token}")
}

/// [`DiscoveryFetcher`] returning a fixed document or a fixed failure.
pub struct StaticFetcher {
    config: Option<ServerConfig>,
}

impl StaticFetcher {
    /// Serves [`server_config`].
    pub fn ok() -> Self {
        Self {
            config: Some(server_config()),
        }
    }

    /// Serves [`server_config`] with a different issuer.
    pub fn with_issuer(issuer: &str) -> Self {
        let mut config = server_config();
        config.issuer = issuer.to_string();
        Self {
            config: Some(config),
        }
    }

    /// Fails every fetch.
    pub fn failing() -> Self {
        Self { config: None }
    }
}

#[async_trait]
impl DiscoveryFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<ServerConfig> {
        self.config
            .clone()
            .ok_or_else(|| OidcError::Discovery(format!("unreachable: {url}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::decode;

    #[test]
    fn test_id_token_for_applies_overrides() {
        let access = make_access_token(100);
        let token = id_token_for(&access, json!({"aud": ["a", "b"], "at_hash": null}));
        let decoded = decode(&token).unwrap();

        assert_eq!(decoded.payload["aud"], json!(["a", "b"]));
        assert!(decoded.payload.get("at_hash").is_none());
        assert_eq!(decoded.payload["iss"], TEST_ISSUER);
    }

    #[tokio::test]
    async fn test_static_fetcher_failing() {
        assert!(StaticFetcher::failing().fetch("http://x").await.is_err());
        assert_eq!(
            StaticFetcher::ok().fetch("http://x").await.unwrap().issuer,
            TEST_ISSUER
        );
    }
}
