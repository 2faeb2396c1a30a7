use base64::Engine as _;
use chrono::Utc;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use implicit_oidc::auth::validator::{compute_at_hash, HashAlphabet};
use implicit_oidc::config::ClientConfig;

#[allow(dead_code)]
pub const CLIENT_ID: &str = "integration-client";

#[allow(dead_code)]
pub fn encode_segment(value: &Value) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(value.to_string())
}

#[allow(dead_code)]
pub fn make_token(header: &Value, payload: &Value) -> String {
    format!(
        "{}.{}.{}",
        encode_segment(header),
        encode_segment(payload),
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("signature")
    )
}

/// Access token valid for an hour.
#[allow(dead_code)]
pub fn access_token() -> String {
    make_token(
        &json!({"alg": "RS256"}),
        &json!({"exp": Utc::now().timestamp() + 3600, "scope": "openid"}),
    )
}

/// RS256 ID token from `issuer` bound to `access_token`, with `extra`
/// claims merged in.
#[allow(dead_code)]
pub fn id_token(issuer: &str, access_token: &str, extra: Value) -> String {
    let mut claims = json!({
        "iss": issuer,
        "aud": CLIENT_ID,
        "sub": "alice",
        "exp": Utc::now().timestamp() + 3600,
        "at_hash": compute_at_hash(access_token, "RS256", HashAlphabet::UrlSafeNoPad),
    });
    if let (Some(target), Value::Object(extra)) = (claims.as_object_mut(), extra) {
        target.extend(extra);
    }
    make_token(&json!({"alg": "RS256"}), &claims)
}

/// Discovery document body for `issuer`.
#[allow(dead_code)]
pub fn discovery_body(issuer: &str) -> Value {
    json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{}/oauth/authorize", issuer),
        "id_token_encryption_alg_values_supported": ["RS256"],
        "response_types_supported": ["token id_token"]
    })
}

/// Client configuration pointing at a server rooted at `base_url`.
#[allow(dead_code)]
pub fn client_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        authorization_url: format!("{}/oauth/authorize", base_url),
        client_id: CLIENT_ID.to_string(),
        redirect_url: "http://localhost:7000?authorizing=true".to_string(),
        discovery_url: format!("{}/.well-known/openid-configuration", base_url),
    }
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
