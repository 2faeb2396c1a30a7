//! OpenID Connect discovery document retrieval
//!
//! The discovery document is fetched fresh for every callback verification
//! and never cached.  Only two members matter to the validator: `issuer` and
//! `id_token_encryption_alg_values_supported`.  The fetch is exposed as the
//! [`DiscoveryFetcher`] capability so the orchestrator can be exercised
//! without a network.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{OidcError, Result};

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// The subset of the OpenID Connect discovery document used for validation.
///
/// # References
///
/// - OpenID Connect Discovery 1.0 <https://openid.net/specs/openid-connect-discovery-1_0.html>
///
/// # Examples
///
/// ```
/// use implicit_oidc::auth::discovery::ServerConfig;
///
/// let json = r#"{
///     "issuer": "http://localhost:8080/auth",
///     "id_token_encryption_alg_values_supported": ["RS256", "HS256"],
///     "jwks_uri": "http://localhost:8080/auth/jwks"
/// }"#;
///
/// let config: ServerConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.issuer, "http://localhost:8080/auth");
/// assert!(config.supports_algorithm("RS256"));
/// assert!(config.extra.contains_key("jwks_uri"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The issuer identifier the ID token `iss` claim must equal.
    pub issuer: String,

    /// Algorithms the server uses for ID tokens.
    ///
    /// A document that omits the member supports nothing, so every ID token
    /// is then rejected for its algorithm.
    #[serde(default)]
    pub id_token_encryption_alg_values_supported: Vec<String>,

    /// Remaining discovery members, kept for diagnostics.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ServerConfig {
    /// Whether `alg` is advertised for ID tokens.  Comparison is
    /// case-sensitive.
    pub fn supports_algorithm(&self, alg: &str) -> bool {
        self.id_token_encryption_alg_values_supported
            .iter()
            .any(|supported| supported == alg)
    }
}

// ---------------------------------------------------------------------------
// DiscoveryFetcher
// ---------------------------------------------------------------------------

/// Retrieves the discovery document.
///
/// This is the single suspension point of callback processing.  There is no
/// retry and no timeout beyond what the implementation's transport imposes.
#[async_trait]
pub trait DiscoveryFetcher: Send + Sync {
    /// Fetches and parses the document at `url`.
    async fn fetch(&self, url: &str) -> Result<ServerConfig>;
}

/// [`DiscoveryFetcher`] over a shared [`reqwest::Client`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use implicit_oidc::auth::discovery::{DiscoveryFetcher, HttpDiscoveryFetcher};
///
/// # async fn example() -> implicit_oidc::error::Result<()> {
/// let fetcher = HttpDiscoveryFetcher::new(Arc::new(reqwest::Client::new()));
/// let config = fetcher
///     .fetch("http://localhost:8080/auth/.well-known/openid-configuration")
///     .await?;
/// println!("issuer: {}", config.issuer);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpDiscoveryFetcher {
    http: Arc<reqwest::Client>,
}

impl HttpDiscoveryFetcher {
    pub fn new(http: Arc<reqwest::Client>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DiscoveryFetcher for HttpDiscoveryFetcher {
    async fn fetch(&self, url: &str) -> Result<ServerConfig> {
        tracing::debug!("Fetching discovery document from {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| OidcError::Discovery(format!("discovery fetch failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(OidcError::Discovery(format!(
                "discovery endpoint returned {}: {}",
                resp.status(),
                url
            ))
            .into());
        }

        let config: ServerConfig = resp.json().await.map_err(|e| {
            OidcError::Discovery(format!("failed to parse discovery document: {e}"))
        })?;

        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
