//! Configuration management for implicit-oidc
//!
//! This module handles loading, parsing and validating configuration from a
//! YAML file, environment variables and CLI overrides.  The result is built
//! once by the binary and handed to the orchestrator; nothing reads it
//! globally.

use crate::error::{OidcError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Identity of this client at the authorization server
    #[serde(default)]
    pub client: ClientConfig,
    /// Host application settings
    #[serde(default)]
    pub app: AppConfig,
    /// Session persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Optional hardening of the callback checks
    #[serde(default)]
    pub security: SecurityConfig,
}

/// Client registration and server endpoints
///
/// The defaults describe a local development setup: an authorization server
/// on port 8080 and the application on port 7000.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Authorization endpoint the user agent is sent to
    #[serde(default = "default_authorization_url")]
    pub authorization_url: String,

    /// Client identifier registered with the server
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Where the server sends the user agent back to
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,

    /// OpenID Connect discovery document location
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,
}

fn default_authorization_url() -> String {
    "http://localhost:8080/auth/oauth/authorize".to_string()
}

fn default_client_id() -> String {
    "my-client".to_string()
}

fn default_redirect_url() -> String {
    "http://localhost:7000?authorizing=true".to_string()
}

fn default_discovery_url() -> String {
    "http://localhost:8080/auth/.well-known/openid-configuration".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            authorization_url: default_authorization_url(),
            client_id: default_client_id(),
            redirect_url: default_redirect_url(),
            discovery_url: default_discovery_url(),
        }
    }
}

/// Host application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Location the user is sent to once a callback has been handled
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
}

fn default_entry_point() -> String {
    crate::auth::orchestrator::DEFAULT_ENTRY_POINT.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            entry_point: default_entry_point(),
        }
    }
}

/// Session persistence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Sled database directory; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Storage scope; defaults to the origin of `client.redirect_url`
    #[serde(default)]
    pub origin: Option<String>,
}

/// Security configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Reject callbacks whose `state` or ID token `nonce` differs from the
    /// values issued at login
    #[serde(default)]
    pub enforce_state_and_nonce: bool,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| OidcError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| OidcError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("IMPLICIT_OIDC_AUTHORIZATION_URL") {
            self.client.authorization_url = url;
        }

        if let Ok(client_id) = std::env::var("IMPLICIT_OIDC_CLIENT_ID") {
            self.client.client_id = client_id;
        }

        if let Ok(url) = std::env::var("IMPLICIT_OIDC_REDIRECT_URL") {
            self.client.redirect_url = url;
        }

        if let Ok(url) = std::env::var("IMPLICIT_OIDC_DISCOVERY_URL") {
            self.client.discovery_url = url;
        }

        if let Ok(entry_point) = std::env::var("IMPLICIT_OIDC_ENTRY_POINT") {
            self.app.entry_point = entry_point;
        }

        if let Ok(path) = std::env::var("IMPLICIT_OIDC_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(path) = &cli.storage_path {
            tracing::debug!("Using storage path override from CLI: {}", path);
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the client id or entry point is empty, or if any of
    /// the client URLs is not an absolute URL
    pub fn validate(&self) -> Result<()> {
        if self.client.client_id.trim().is_empty() {
            return Err(OidcError::Config("client.client_id cannot be empty".to_string()).into());
        }

        for (name, value) in [
            ("client.authorization_url", &self.client.authorization_url),
            ("client.redirect_url", &self.client.redirect_url),
            ("client.discovery_url", &self.client.discovery_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                OidcError::Config(format!("{} is not a valid URL ({}): {}", name, value, e))
            })?;
        }

        if self.app.entry_point.is_empty() {
            return Err(OidcError::Config("app.entry_point cannot be empty".to_string()).into());
        }

        if let Some(origin) = &self.storage.origin {
            if origin.is_empty() {
                return Err(
                    OidcError::Config("storage.origin cannot be empty".to_string()).into(),
                );
            }
        }

        Ok(())
    }

    /// The origin the persisted session is scoped to
    ///
    /// Uses `storage.origin` when set, otherwise the origin of
    /// `client.redirect_url` (for example `http://localhost:7000`).
    pub fn storage_origin(&self) -> Result<String> {
        if let Some(origin) = &self.storage.origin {
            return Ok(origin.clone());
        }

        let redirect = url::Url::parse(&self.client.redirect_url).map_err(|e| {
            OidcError::Config(format!("client.redirect_url is not a valid URL: {}", e))
        })?;
        Ok(redirect.origin().ascii_serialization())
    }

    /// The sled database directory
    ///
    /// Uses `storage.path` when set, otherwise `session.db` under the
    /// platform data directory, which is created if needed.
    pub fn storage_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }

        let proj_dirs = ProjectDirs::from("org", "implicit-oidc", "implicit-oidc")
            .ok_or_else(|| OidcError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|e| {
            OidcError::Storage(format!("Failed to create data directory: {}", e))
        })?;

        Ok(data_dir.join("session.db"))
    }
}
