//! ID token and access token validation
//!
//! Applies the OpenID Connect implicit-flow checks to a freshly received
//! token pair.  All checks must pass, and they run in a fixed order so the
//! first failure determines the reported reason:
//!
//! 1. both tokens decode (`MalformedToken`)
//! 2. ID token `iss` equals the discovery `issuer` (`IssuerMismatch`)
//! 3. ID token `aud` names this client (`AudienceMismatch`)
//! 4. ID token header `alg` is advertised by the server (`UnsupportedAlgorithm`)
//! 5. ID token `exp` is in the future (`Expired`)
//! 6. the access token hashes to `at_hash` (`AccessTokenBindingFailed`)
//! 7. access token `exp` is in the future (`Expired`)
//! 8. ID token `nonce` equals the issued nonce, when one is expected
//!    (`NonceMismatch`)
//!
//! The token signature is not verified.  Trust rests on the `at_hash`
//! binding and on the transport.

use base64::Engine as _;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::auth::claims::{self, AccessTokenClaims, DecodedToken, IdTokenClaims};
use crate::auth::discovery::ServerConfig;
use crate::error::RejectionReason;

// ---------------------------------------------------------------------------
// VerificationResult
// ---------------------------------------------------------------------------

/// Outcome of [`TokenValidator::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    Verified,
    Rejected(RejectionReason),
}

impl VerificationResult {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationResult::Verified)
    }
}

// ---------------------------------------------------------------------------
// HashAlphabet
// ---------------------------------------------------------------------------

/// Base64 flavour used to encode an `at_hash` value.
///
/// The alphabet and the padding are independent: a claim may be URL-safe and
/// padded, or standard and unpadded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlphabet {
    /// RFC 4648 section 5, no padding (what OIDC prescribes).
    UrlSafeNoPad,
    /// RFC 4648 section 5, padded.
    UrlSafePadded,
    /// RFC 4648 section 4, no padding.
    StandardNoPad,
    /// RFC 4648 section 4, padded (what `btoa` produces).
    StandardPadded,
}

impl HashAlphabet {
    /// Infers the encoding an existing `at_hash` claim was written in.
    ///
    /// `+` or `/` selects the standard alphabet and `-` or `_` the URL-safe
    /// one; a trailing `=` selects padding.  A value with none of the four
    /// alphabet characters encodes identically under both, so a padded one is
    /// treated as standard and an unpadded one as URL-safe.
    pub fn detect(encoded: &str) -> Self {
        let padded = encoded.ends_with('=');
        let standard = if encoded.contains(['+', '/']) {
            true
        } else if encoded.contains(['-', '_']) {
            false
        } else {
            padded
        };

        match (standard, padded) {
            (false, false) => HashAlphabet::UrlSafeNoPad,
            (false, true) => HashAlphabet::UrlSafePadded,
            (true, false) => HashAlphabet::StandardNoPad,
            (true, true) => HashAlphabet::StandardPadded,
        }
    }

    fn encode(self, bytes: &[u8]) -> String {
        use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};

        match self {
            HashAlphabet::UrlSafeNoPad => URL_SAFE_NO_PAD.encode(bytes),
            HashAlphabet::UrlSafePadded => URL_SAFE.encode(bytes),
            HashAlphabet::StandardNoPad => STANDARD_NO_PAD.encode(bytes),
            HashAlphabet::StandardPadded => STANDARD.encode(bytes),
        }
    }
}

// ---------------------------------------------------------------------------
// TokenValidator
// ---------------------------------------------------------------------------

/// Validates token pairs issued to one client.
///
/// # Examples
///
/// ```
/// use implicit_oidc::auth::discovery::ServerConfig;
/// use implicit_oidc::auth::validator::{TokenValidator, VerificationResult};
/// use implicit_oidc::error::RejectionReason;
///
/// let server = ServerConfig {
///     issuer: "https://auth.example.com".to_string(),
///     id_token_encryption_alg_values_supported: vec!["RS256".to_string()],
///     extra: Default::default(),
/// };
///
/// let result = TokenValidator::new("my-client").verify("not-a-jwt", "also.not", &server);
/// assert_eq!(result, VerificationResult::Rejected(RejectionReason::MalformedToken));
/// ```
#[derive(Debug, Clone)]
pub struct TokenValidator {
    client_id: String,
    expected_nonce: Option<String>,
}

impl TokenValidator {
    /// Creates a validator for tokens issued to `client_id`.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            expected_nonce: None,
        }
    }

    /// Additionally require the ID token `nonce` claim to equal `nonce`.
    pub fn expect_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.expected_nonce = Some(nonce.into());
        self
    }

    /// Runs every check against the raw token strings.
    pub fn verify(
        &self,
        access_token: &str,
        id_token: &str,
        server_config: &ServerConfig,
    ) -> VerificationResult {
        match self.check(access_token, id_token, server_config) {
            Ok(()) => VerificationResult::Verified,
            Err(reason) => VerificationResult::Rejected(reason),
        }
    }

    fn check(
        &self,
        access_token: &str,
        id_token: &str,
        server_config: &ServerConfig,
    ) -> Result<(), RejectionReason> {
        let decoded_access = decode(access_token)?;
        let decoded_id = decode(id_token)?;
        let id_claims: IdTokenClaims = decoded_id
            .claims()
            .map_err(|_| RejectionReason::MalformedToken)?;
        let access_claims: AccessTokenClaims = decoded_access
            .claims()
            .map_err(|_| RejectionReason::MalformedToken)?;

        if id_claims.iss != server_config.issuer {
            return Err(RejectionReason::IssuerMismatch);
        }

        if !id_claims.aud.contains(&self.client_id) {
            return Err(RejectionReason::AudienceMismatch);
        }

        let alg = decoded_id.algorithm().unwrap_or_default();
        if !server_config.supports_algorithm(alg) {
            return Err(RejectionReason::UnsupportedAlgorithm);
        }

        if !claims::expiry_in_future(id_claims.exp) {
            return Err(RejectionReason::Expired);
        }

        let bound = id_claims
            .at_hash
            .as_deref()
            .is_some_and(|at_hash| access_token_matches(access_token, alg, at_hash));
        if !bound {
            return Err(RejectionReason::AccessTokenBindingFailed);
        }

        if !claims::expiry_in_future(access_claims.exp) {
            return Err(RejectionReason::Expired);
        }

        if let Some(expected) = &self.expected_nonce {
            if id_claims.nonce.as_deref() != Some(expected.as_str()) {
                return Err(RejectionReason::NonceMismatch);
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// at_hash
// ---------------------------------------------------------------------------

/// Computes the `at_hash` value for `access_token`.
///
/// The digest follows the size suffix of `alg` (`*384` selects SHA-384,
/// `*512` selects SHA-512, anything else SHA-256).  The left half of the
/// digest is encoded with `alphabet`.
///
/// # Examples
///
/// ```
/// use implicit_oidc::auth::validator::{compute_at_hash, HashAlphabet};
///
/// // Example from OpenID Connect Core 1.0, Appendix A.4
/// let at_hash = compute_at_hash(
///     "jHkWEdUXMU1BwAsC4vtUsZwnNvTIxEl0z9K3vx5KF0Y",
///     "RS256",
///     HashAlphabet::UrlSafeNoPad,
/// );
/// assert_eq!(at_hash, "77QmUPtjPfzWtF2AnpK9RQ");
/// ```
pub fn compute_at_hash(access_token: &str, alg: &str, alphabet: HashAlphabet) -> String {
    let digest: Vec<u8> = if alg.ends_with("384") {
        Sha384::digest(access_token.as_bytes()).to_vec()
    } else if alg.ends_with("512") {
        Sha512::digest(access_token.as_bytes()).to_vec()
    } else {
        Sha256::digest(access_token.as_bytes()).to_vec()
    };

    alphabet.encode(&digest[..digest.len() / 2])
}

fn access_token_matches(access_token: &str, alg: &str, at_hash: &str) -> bool {
    compute_at_hash(access_token, alg, HashAlphabet::detect(at_hash)) == at_hash
}

fn decode(token: &str) -> Result<DecodedToken, RejectionReason> {
    claims::decode(token).map_err(|_| RejectionReason::MalformedToken)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
