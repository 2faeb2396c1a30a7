//! Persisted session storage for the implicit flow
//!
//! The session consists of three independent strings: the ID token, the
//! access token and the opaque session-state marker.  Each is written under a
//! fixed key so that other clients sharing the same origin storage find them
//! where they expect:
//!
//! | artifact       | key   |
//! |----------------|-------|
//! | access token   | `at`  |
//! | ID token       | `idt` |
//! | session state  | `ss`  |
//!
//! The store enforces no expiry of its own.  Whether a stored token is still
//! usable is computed from its claims by the orchestrator.
//!
//! A fourth key, `pl`, holds the [`PendingLogin`] record written when a login
//! redirect is issued; it is only consulted when state/nonce enforcement is
//! enabled.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::storage::KeyValueStorage;
use crate::error::Result;

const ACCESS_TOKEN_KEY: &str = "at";
const ID_TOKEN_KEY: &str = "idt";
const SESSION_STATE_KEY: &str = "ss";
const PENDING_LOGIN_KEY: &str = "pl";

// ---------------------------------------------------------------------------
// TokenKind
// ---------------------------------------------------------------------------

/// The three artifacts that make up a persisted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// The OIDC ID token.
    IdToken,
    /// The OAuth2 bearer access token.
    AccessToken,
    /// The authorization server's opaque `session_state` marker.
    SessionState,
}

impl TokenKind {
    /// All kinds, in the order they are cleared.
    pub const ALL: [TokenKind; 3] = [
        TokenKind::IdToken,
        TokenKind::AccessToken,
        TokenKind::SessionState,
    ];

    /// The storage key this artifact is persisted under.
    ///
    /// # Examples
    ///
    /// ```
    /// use implicit_oidc::auth::token_store::TokenKind;
    ///
    /// assert_eq!(TokenKind::AccessToken.storage_key(), "at");
    /// assert_eq!(TokenKind::IdToken.storage_key(), "idt");
    /// assert_eq!(TokenKind::SessionState.storage_key(), "ss");
    /// ```
    pub fn storage_key(self) -> &'static str {
        match self {
            TokenKind::IdToken => ID_TOKEN_KEY,
            TokenKind::AccessToken => ACCESS_TOKEN_KEY,
            TokenKind::SessionState => SESSION_STATE_KEY,
        }
    }
}

// ---------------------------------------------------------------------------
// PersistedSession
// ---------------------------------------------------------------------------

/// Snapshot of the three persisted artifacts, each independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSession {
    /// The stored ID token, if any.
    pub id_token: Option<String>,
    /// The stored access token, if any.
    pub access_token: Option<String>,
    /// The stored session-state marker, if any.
    pub session_state: Option<String>,
}

impl PersistedSession {
    /// `true` when nothing at all is stored.
    pub fn is_empty(&self) -> bool {
        self.id_token.is_none() && self.access_token.is_none() && self.session_state.is_none()
    }
}

// ---------------------------------------------------------------------------
// PendingLogin
// ---------------------------------------------------------------------------

/// The `state` and `nonce` issued with the most recent login redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    /// Anti-forgery value echoed back by the authorization server.
    pub state: String,

    /// Replay-protection value the server embeds in the ID token.
    pub nonce: String,

    /// When the redirect was issued.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// TokenStore
// ---------------------------------------------------------------------------

/// Typed accessor over an origin-scoped [`KeyValueStorage`].
///
/// Every call goes straight to the backing storage; nothing is cached in
/// memory, so a check made after another process wrote new tokens observes
/// them.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use implicit_oidc::auth::storage::MemoryStorage;
/// use implicit_oidc::auth::token_store::{TokenKind, TokenStore};
///
/// # fn main() -> implicit_oidc::error::Result<()> {
/// let store = TokenStore::new(Arc::new(MemoryStorage::new()));
/// store.save(TokenKind::IdToken, "h.p.s")?;
/// assert_eq!(store.load(TokenKind::IdToken)?.as_deref(), Some("h.p.s"));
///
/// store.clear()?;
/// assert!(store.load(TokenKind::IdToken)?.is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl TokenStore {
    /// Wraps the given storage backend.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Writes `value` under the fixed key for `kind`.
    ///
    /// # Errors
    ///
    /// Propagates storage backend failures.
    pub fn save(&self, kind: TokenKind, value: &str) -> Result<()> {
        self.storage.set(kind.storage_key(), value)
    }

    /// Reads the value stored for `kind`.
    ///
    /// Empty strings are reported as absent.
    ///
    /// # Errors
    ///
    /// Propagates storage backend failures.
    pub fn load(&self, kind: TokenKind) -> Result<Option<String>> {
        Ok(self
            .storage
            .get(kind.storage_key())?
            .filter(|value| !value.is_empty()))
    }

    /// Reads all three artifacts at once.
    pub fn load_session(&self) -> Result<PersistedSession> {
        Ok(PersistedSession {
            id_token: self.load(TokenKind::IdToken)?,
            access_token: self.load(TokenKind::AccessToken)?,
            session_state: self.load(TokenKind::SessionState)?,
        })
    }

    /// Removes the ID token, access token and session state.
    pub fn clear(&self) -> Result<()> {
        for kind in TokenKind::ALL {
            self.storage.remove(kind.storage_key())?;
        }
        Ok(())
    }

    /// Records the `state` / `nonce` pair of a login redirect, replacing any
    /// earlier pending login.
    pub fn save_pending_login(&self, pending: &PendingLogin) -> Result<()> {
        let json = serde_json::to_string(pending)?;
        self.storage.set(PENDING_LOGIN_KEY, &json)
    }

    /// Removes and returns the pending login record.
    ///
    /// A record that no longer deserializes is discarded and reported as
    /// absent.
    pub fn take_pending_login(&self) -> Result<Option<PendingLogin>> {
        let raw = self.storage.get(PENDING_LOGIN_KEY)?;
        self.storage.remove(PENDING_LOGIN_KEY)?;

        Ok(raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(pending) => Some(pending),
            Err(e) => {
                tracing::warn!("Discarding unreadable pending login record: {}", e);
                None
            }
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
