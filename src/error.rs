//! Error types for the implicit-flow client
//!
//! Infrastructure failures (configuration, storage, HTTP, navigation) are
//! modelled by [`OidcError`] and propagated through the anyhow-based
//! [`Result`] alias.  Protocol outcomes of a callback attempt are values, not
//! errors: see [`RejectionReason`], which is carried by
//! [`VerificationResult`](crate::auth::validator::VerificationResult) and
//! [`CallbackOutcome`](crate::auth::orchestrator::CallbackOutcome).

use thiserror::Error;

/// Main error type for infrastructure operations
///
/// This enum covers everything that can go wrong around the protocol logic:
/// loading configuration, reading or writing the persisted session, fetching
/// the discovery document, and handing a URL to the navigator.
#[derive(Error, Debug)]
pub enum OidcError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisted session storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Discovery document could not be fetched or parsed
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// The navigator could not move to the requested location
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Why a callback attempt was refused.
///
/// Every reason is terminal for the attempt in progress: nothing is persisted
/// and the user has to start a new login.  The `Display` text is what ends up
/// in the visible `error` parameter of the entry point.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// Wrong segment count, undecodable base64, or undecodable JSON
    #[error("The sign on response contained a malformed token.")]
    MalformedToken,

    /// `iss` of the ID token differs from the discovery document issuer
    #[error("The ID token was not issued by the configured authorization server.")]
    IssuerMismatch,

    /// `aud` of the ID token does not name this client
    #[error("The ID token was not issued for this client.")]
    AudienceMismatch,

    /// The ID token header algorithm is not advertised by the server
    #[error("The ID token was signed with an unsupported algorithm.")]
    UnsupportedAlgorithm,

    /// `exp` of the ID token or access token is not in the future
    #[error("The sign on response contained an expired token.")]
    Expired,

    /// The access token does not hash to the ID token `at_hash` claim
    #[error("The access token is not bound to the ID token.")]
    AccessTokenBindingFailed,

    /// The authorization server answered with `error` / `error_description`
    #[error("{0}")]
    ProviderError(String),

    /// The discovery document could not be retrieved
    #[error("The sign on could not be verified. Please contact the server administrator.")]
    DiscoveryFetchFailed,

    /// Neither an access token nor an ID token was returned
    #[error("The sign on response did not contain any tokens.")]
    MissingTokens,

    /// Echoed `state` does not match the pending login
    #[error("The sign on response does not belong to a login started here.")]
    StateMismatch,

    /// ID token `nonce` does not match the pending login
    #[error("The ID token was issued for a different login request.")]
    NonceMismatch,
}

/// Result type alias for infrastructure operations
///
/// Uses `anyhow::Error` so that storage, HTTP and configuration failures can
/// carry context while still downcasting to [`OidcError`] when needed.
pub type Result<T> = anyhow::Result<T>;
