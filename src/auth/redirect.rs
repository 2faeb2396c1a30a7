//! Authorization request URL construction
//!
//! Builds the implicit-flow authorization URL the user agent is sent to:
//!
//! ```text
//! <authorization_url>?client_id=..&redirect_uri=..&response_type=token%20id_token
//!     &scope=openid&state=<random>&nonce=<random>
//! ```
//!
//! Every call draws a fresh `state` and `nonce`.  The builder itself keeps no
//! record of what it issued; the orchestrator decides whether to persist the
//! pair for later comparison.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use uuid::Uuid;

use crate::config::ClientConfig;

/// Characters left unescaped by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Both token types are requested in a single implicit-flow response.
const RESPONSE_TYPE: &str = "token id_token";

const SCOPE: &str = "openid";

// ---------------------------------------------------------------------------
// LoginRequest
// ---------------------------------------------------------------------------

/// A ready-to-navigate authorization URL together with the random values
/// embedded in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    /// The full authorization URL.
    pub url: String,
    /// The anti-forgery `state` parameter.
    pub state: String,
    /// The replay-protection `nonce` parameter.
    pub nonce: String,
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// Builds the authorization URL for `config` with a fresh state/nonce pair.
///
/// # Examples
///
/// ```
/// use implicit_oidc::auth::redirect::build_login_url;
/// use implicit_oidc::config::ClientConfig;
///
/// let config = ClientConfig {
///     authorization_url: "http://localhost:8080/auth/oauth/authorize".to_string(),
///     client_id: "my-client".to_string(),
///     redirect_url: "http://localhost:7000?authorizing=true".to_string(),
///     discovery_url: "http://localhost:8080/auth/.well-known/openid-configuration".to_string(),
/// };
///
/// let request = build_login_url(&config);
/// assert!(request.url.starts_with("http://localhost:8080/auth/oauth/authorize/?client_id=my-client"));
/// assert!(request.url.contains("&response_type=token%20id_token&scope=openid"));
/// assert!(request.url.ends_with(&format!("&nonce={}", request.nonce)));
/// ```
pub fn build_login_url(config: &ClientConfig) -> LoginRequest {
    let state = generate_random_value();
    let nonce = generate_random_value();

    let mut url = with_query_separator(&config.authorization_url);
    url.push_str(&format!(
        "client_id={}&redirect_uri={}&response_type={}&scope={}&state={}&nonce={}",
        encode_component(&config.client_id),
        encode_component(&config.redirect_url),
        encode_component(RESPONSE_TYPE),
        encode_component(SCOPE),
        encode_component(&state),
        encode_component(&nonce),
    ));

    LoginRequest { url, state, nonce }
}

/// Percent-encodes `value` the way `encodeURIComponent` does.
///
/// # Examples
///
/// ```
/// use implicit_oidc::auth::redirect::encode_component;
///
/// assert_eq!(encode_component("token id_token"), "token%20id_token");
/// assert_eq!(encode_component("http://a/?x=1"), "http%3A%2F%2Fa%2F%3Fx%3D1");
/// ```
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Returns `base` followed by the separator the first parameter needs.
fn with_query_separator(base: &str) -> String {
    let mut url = base.to_string();
    if url.contains('?') {
        if !url.ends_with('?') && !url.ends_with('&') {
            url.push('&');
        }
    } else if url.ends_with('/') {
        url.push('?');
    } else {
        url.push_str("/?");
    }
    url
}

/// Random v4 UUID rendered as a hyphenated string.
fn generate_random_value() -> String {
    Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
