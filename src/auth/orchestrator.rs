//! Implicit-flow orchestration
//!
//! [`AuthOrchestrator`] ties the pieces together and is the only type the
//! hosting application talks to.  It answers the shell's questions ("is the
//! user authenticated / authorized, has either expired"), starts a login, and
//! processes the redirect callback.
//!
//! # Flow
//!
//! ```text
//! Idle --login()------------------> AwaitingCallback   (user agent leaves)
//! Idle --process_callback()-------> VerifyingCallback  (discovery fetch)
//!      VerifyingCallback ---------> Settled(state)     (persist or reject,
//!                                                       then navigate)
//! Idle --check_status()-----------> Settled(state)     (local only)
//! ```
//!
//! Status checks always re-read the [`TokenStore`]; nothing about the session
//! is cached in memory.  Storage, navigation and discovery are injected
//! capabilities, so the state machine runs without a real browser.

use std::sync::{Arc, Mutex};

use crate::auth::callback::{self, AuthResponse};
use crate::auth::claims;
use crate::auth::discovery::DiscoveryFetcher;
use crate::auth::navigator::Navigator;
use crate::auth::redirect::{self, LoginRequest};
use crate::auth::token_store::{PendingLogin, PersistedSession, TokenKind, TokenStore};
use crate::auth::validator::{TokenValidator, VerificationResult};
use crate::config::ClientConfig;
use crate::error::{RejectionReason, Result};

/// Where the application lives once a callback has been handled.
pub const DEFAULT_ENTRY_POINT: &str = "/index.html";

// ---------------------------------------------------------------------------
// AuthState / FlowPhase / CallbackOutcome
// ---------------------------------------------------------------------------

/// Session status derived from the persisted tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No ID token is stored.
    LoggedOut,
    /// Both tokens are stored and unexpired.
    Authenticated,
    /// The stored ID token is expired or unreadable.
    AuthenticationExpired,
    /// The ID token is fine but the access token is missing, expired or
    /// unreadable.
    AuthorizationExpired,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AuthState::LoggedOut => "logged out",
            AuthState::Authenticated => "authenticated",
            AuthState::AuthenticationExpired => "authentication expired",
            AuthState::AuthorizationExpired => "authorization expired",
        };
        f.write_str(label)
    }
}

/// Where the orchestrator is in the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    Idle,
    /// A login redirect was issued.
    AwaitingCallback,
    /// A callback is waiting on the discovery document.
    VerifyingCallback,
    Settled(AuthState),
}

/// Result of one callback attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Tokens were verified and persisted.  `reloaded` tells whether the
    /// top-level context was reloaded instead of sent to the entry point.
    Authenticated { reloaded: bool },
    /// Nothing was persisted; the user was sent to the entry point with the
    /// reason as a visible error.
    Rejected(RejectionReason),
}

// ---------------------------------------------------------------------------
// AuthOrchestrator
// ---------------------------------------------------------------------------

/// Implicit-flow state machine.
///
/// Construct one per composition root; there is no global instance.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use implicit_oidc::auth::discovery::HttpDiscoveryFetcher;
/// use implicit_oidc::auth::navigator::RecordingNavigator;
/// use implicit_oidc::auth::orchestrator::{AuthOrchestrator, AuthState};
/// use implicit_oidc::auth::storage::MemoryStorage;
/// use implicit_oidc::auth::token_store::TokenStore;
/// use implicit_oidc::config::ClientConfig;
///
/// # fn main() -> implicit_oidc::error::Result<()> {
/// let orchestrator = AuthOrchestrator::new(
///     ClientConfig::default(),
///     TokenStore::new(Arc::new(MemoryStorage::new())),
///     Arc::new(RecordingNavigator::new()),
///     Arc::new(HttpDiscoveryFetcher::new(Arc::new(reqwest::Client::new()))),
/// );
///
/// assert_eq!(orchestrator.check_status()?, AuthState::LoggedOut);
/// assert!(!orchestrator.is_authenticated()?);
/// # Ok(())
/// # }
/// ```
pub struct AuthOrchestrator {
    client: ClientConfig,
    entry_point: String,
    enforce_state_and_nonce: bool,
    store: TokenStore,
    navigator: Arc<dyn Navigator>,
    fetcher: Arc<dyn DiscoveryFetcher>,
    phase: Mutex<FlowPhase>,
}

impl AuthOrchestrator {
    /// Creates an orchestrator for `client` using the given capabilities.
    ///
    /// The entry point defaults to [`DEFAULT_ENTRY_POINT`] and state/nonce
    /// enforcement is off.
    pub fn new(
        client: ClientConfig,
        store: TokenStore,
        navigator: Arc<dyn Navigator>,
        fetcher: Arc<dyn DiscoveryFetcher>,
    ) -> Self {
        Self {
            client,
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            enforce_state_and_nonce: false,
            store,
            navigator,
            fetcher,
            phase: Mutex::new(FlowPhase::Idle),
        }
    }

    /// Sets the location the user is sent to after a callback.
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    /// Requires callbacks to echo the `state` and carry the `nonce` issued by
    /// the most recent [`login`](Self::login).
    pub fn enforce_state_and_nonce(mut self, enforce: bool) -> Self {
        self.enforce_state_and_nonce = enforce;
        self
    }

    /// The client this orchestrator authenticates.
    pub fn client(&self) -> &ClientConfig {
        &self.client
    }

    /// Current position in the flow.
    pub fn phase(&self) -> FlowPhase {
        *self.lock_phase()
    }

    // -----------------------------------------------------------------------
    // Shell-facing status
    // -----------------------------------------------------------------------

    /// `true` when an ID token is stored.
    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.store.load(TokenKind::IdToken)?.is_some())
    }

    /// `true` when an access token is stored.
    pub fn is_authorized(&self) -> Result<bool> {
        Ok(self.store.load(TokenKind::AccessToken)?.is_some())
    }

    /// `true` unless a readable, unexpired ID token is stored.
    pub fn authentication_is_expired(&self) -> Result<bool> {
        Ok(!self
            .store
            .load(TokenKind::IdToken)?
            .is_some_and(|token| token_is_live(&token)))
    }

    /// `true` unless a readable, unexpired access token is stored.
    pub fn authorization_is_expired(&self) -> Result<bool> {
        Ok(!self
            .store
            .load(TokenKind::AccessToken)?
            .is_some_and(|token| token_is_live(&token)))
    }

    /// Derives the session status from the store without any network call.
    pub fn check_status(&self) -> Result<AuthState> {
        let state = derive_state(&self.store.load_session()?);
        tracing::debug!("Session status: {}", state);
        self.set_phase(FlowPhase::Settled(state));
        Ok(state)
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Sends the user agent to the authorization server.
    ///
    /// The issued state and nonce are persisted so the callback, which runs
    /// after the page has been replaced, can compare against them.
    pub fn login(&self) -> Result<LoginRequest> {
        let request = redirect::build_login_url(&self.client);

        self.store.save_pending_login(&PendingLogin {
            state: request.state.clone(),
            nonce: request.nonce.clone(),
            issued_at: chrono::Utc::now(),
        })?;

        tracing::info!(
            "Redirecting to authorization server for client '{}'",
            self.client.client_id
        );
        self.set_phase(FlowPhase::AwaitingCallback);
        self.navigator.assign(&request.url)?;
        Ok(request)
    }

    /// Processes the full redirect target the user agent landed on.
    pub async fn process_auth(&self, location: &str) -> Result<CallbackOutcome> {
        let (fragment, query) = callback::split_redirect_target(location);
        self.process_callback(fragment, query).await
    }

    /// Processes a redirect callback given its fragment and query string.
    ///
    /// Protocol failures are returned as [`CallbackOutcome::Rejected`]; only
    /// storage and navigation failures are errors.  In every case the
    /// pending login record is consumed.
    pub async fn process_callback(&self, fragment: &str, query: &str) -> Result<CallbackOutcome> {
        let response = callback::parse(fragment, query);
        let keys: Vec<&str> = response.keys().collect();
        tracing::debug!("Callback carried parameters: {:?}", keys);

        let pending = self.store.take_pending_login()?;

        let (access_token, id_token) = match self.precheck(&response, pending.as_ref()) {
            Ok(tokens) => tokens,
            Err(reason) => return self.reject(reason),
        };

        self.set_phase(FlowPhase::VerifyingCallback);
        let server_config = match self.fetcher.fetch(&self.client.discovery_url).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Discovery document unavailable: {:#}", e);
                return self.reject(RejectionReason::DiscoveryFetchFailed);
            }
        };

        let mut validator = TokenValidator::new(self.client.client_id.clone());
        if self.enforce_state_and_nonce {
            if let Some(pending) = &pending {
                validator = validator.expect_nonce(pending.nonce.clone());
            }
        }

        match validator.verify(&access_token, &id_token, &server_config) {
            VerificationResult::Verified => {
                self.persist(&access_token, &id_token, response.session_state().as_deref())?;
                self.set_phase(FlowPhase::Settled(AuthState::Authenticated));

                let reloaded = response.refresh_requested();
                tracing::info!("Sign on verified; tokens stored");
                if reloaded {
                    self.navigator.reload()?;
                } else {
                    self.navigator.assign(&self.entry_point)?;
                }
                Ok(CallbackOutcome::Authenticated { reloaded })
            }
            VerificationResult::Rejected(reason) => self.reject(reason),
        }
    }

    /// Silent token renewal.  Not implemented: this does nothing and leaves
    /// the session untouched.
    pub fn refresh_auth(&self) -> Result<()> {
        tracing::debug!("Silent token renewal is not implemented");
        Ok(())
    }

    /// Forgets the persisted session.
    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        tracing::info!("Session cleared");
        self.set_phase(FlowPhase::Settled(AuthState::LoggedOut));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// Checks that need no network: provider errors, token presence and the
    /// echoed state.  Returns the decoded token pair.
    fn precheck(
        &self,
        response: &AuthResponse,
        pending: Option<&PendingLogin>,
    ) -> std::result::Result<(String, String), RejectionReason> {
        let error = response.error();
        let description = response.error_description();
        if error.is_some() || description.is_some() {
            let message = description
                .or(error)
                .unwrap_or_else(|| "The authorization server reported an error.".to_string());
            return Err(RejectionReason::ProviderError(message));
        }

        let access_token = response.access_token();
        let id_token = response.id_token();
        if access_token.is_none() && id_token.is_none() {
            return Err(RejectionReason::MissingTokens);
        }

        if self.enforce_state_and_nonce {
            let expected = pending.map(|p| p.state.as_str());
            if expected.is_none() || response.state().as_deref() != expected {
                return Err(RejectionReason::StateMismatch);
            }
        }

        match (access_token, id_token) {
            (Some(access_token), Some(id_token)) => Ok((access_token, id_token)),
            _ => Err(RejectionReason::MalformedToken),
        }
    }

    fn persist(&self, access_token: &str, id_token: &str, session_state: Option<&str>) -> Result<()> {
        self.store.save(TokenKind::AccessToken, access_token)?;
        self.store.save(TokenKind::IdToken, id_token)?;
        if let Some(session_state) = session_state {
            self.store.save(TokenKind::SessionState, session_state)?;
        }
        Ok(())
    }

    fn reject(&self, reason: RejectionReason) -> Result<CallbackOutcome> {
        tracing::warn!("Sign on rejected: {:?}", reason);

        let location = error_location(&self.entry_point, &reason);
        self.navigator.assign(&location)?;

        match self.store.load_session() {
            Ok(session) => self.set_phase(FlowPhase::Settled(derive_state(&session))),
            Err(e) => {
                tracing::warn!("Session unreadable after rejection: {:#}", e);
                self.set_phase(FlowPhase::Idle);
            }
        }
        Ok(CallbackOutcome::Rejected(reason))
    }

    fn set_phase(&self, phase: FlowPhase) {
        *self.lock_phase() = phase;
    }

    fn lock_phase(&self) -> std::sync::MutexGuard<'_, FlowPhase> {
        self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Free helpers
// ---------------------------------------------------------------------------

/// Maps a persisted session to its status.
pub fn derive_state(session: &PersistedSession) -> AuthState {
    let Some(id_token) = &session.id_token else {
        return AuthState::LoggedOut;
    };
    if !token_is_live(id_token) {
        return AuthState::AuthenticationExpired;
    }
    match &session.access_token {
        Some(access_token) if token_is_live(access_token) => AuthState::Authenticated,
        _ => AuthState::AuthorizationExpired,
    }
}

/// A stored token is live when it decodes and its `exp` is in the future.
/// A token without a numeric `exp` counts as expired.
fn token_is_live(token: &str) -> bool {
    claims::decode(token)
        .ok()
        .and_then(|decoded| decoded.payload.get("exp").and_then(serde_json::Value::as_f64))
        .is_some_and(claims::expiry_in_future)
}

/// The entry point carrying `reason` as a visible `error` parameter.
fn error_location(entry_point: &str, reason: &RejectionReason) -> String {
    let separator = if entry_point.contains('?') { '&' } else { '?' };
    format!(
        "{}{}error={}",
        entry_point,
        separator,
        redirect::encode_component(&reason.to_string())
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::navigator::{Navigation, RecordingNavigator};
    use crate::auth::storage::{KeyValueStorage, MemoryStorage};
    use crate::test_utils::{
        callback_fragment, id_token_for, make_access_token, test_client_config, StaticFetcher,
    };
    use chrono::Utc;
    use serde_json::json;

    /// Storage whose token keys cannot be read; other keys behave normally.
    #[derive(Default)]
    struct UnreadableSession {
        inner: MemoryStorage,
    }

    impl KeyValueStorage for UnreadableSession {
        fn get(&self, key: &str) -> Result<Option<String>> {
            if TokenKind::ALL.iter().any(|kind| kind.storage_key() == key) {
                return Err(crate::error::OidcError::Storage("corrupt tree".to_string()).into());
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    struct Harness {
        orchestrator: AuthOrchestrator,
        store: TokenStore,
        navigator: Arc<RecordingNavigator>,
    }

    fn harness(fetcher: StaticFetcher) -> Harness {
        let store = TokenStore::new(Arc::new(MemoryStorage::new()));
        let navigator = Arc::new(RecordingNavigator::new());
        let orchestrator = AuthOrchestrator::new(
            test_client_config(),
            store.clone(),
            navigator.clone(),
            Arc::new(fetcher),
        );
        Harness {
            orchestrator,
            store,
            navigator,
        }
    }

    fn valid_pair() -> (String, String) {
        let access = make_access_token(Utc::now().timestamp() + 3600);
        let id = id_token_for(&access, json!({}));
        (access, id)
    }

    #[test]
    fn test_empty_store_is_logged_out() {
        let h = harness(StaticFetcher::ok());
        assert_eq!(h.orchestrator.check_status().unwrap(), AuthState::LoggedOut);
        assert_eq!(
            h.orchestrator.phase(),
            FlowPhase::Settled(AuthState::LoggedOut)
        );
        assert!(h.orchestrator.authentication_is_expired().unwrap());
        assert!(h.orchestrator.authorization_is_expired().unwrap());
    }

    #[test]
    fn test_derive_state_variants() {
        let (access, id) = valid_pair();
        let expired_access = make_access_token(Utc::now().timestamp() - 10);
        let expired_id = id_token_for(&access, json!({"exp": Utc::now().timestamp() - 10}));

        let session = |id: Option<&str>, at: Option<&str>| PersistedSession {
            id_token: id.map(str::to_string),
            access_token: at.map(str::to_string),
            session_state: None,
        };

        assert_eq!(derive_state(&session(None, Some(&access))), AuthState::LoggedOut);
        assert_eq!(
            derive_state(&session(Some(&id), Some(&access))),
            AuthState::Authenticated
        );
        assert_eq!(
            derive_state(&session(Some(&expired_id), Some(&access))),
            AuthState::AuthenticationExpired
        );
        assert_eq!(
            derive_state(&session(Some("garbage"), Some(&access))),
            AuthState::AuthenticationExpired
        );
        assert_eq!(
            derive_state(&session(Some(&id), Some(&expired_access))),
            AuthState::AuthorizationExpired
        );
        assert_eq!(
            derive_state(&session(Some(&id), None)),
            AuthState::AuthorizationExpired
        );
    }

    #[test]
    fn test_login_navigates_to_authorization_url() {
        let h = harness(StaticFetcher::ok());
        let request = h.orchestrator.login().unwrap();

        assert_eq!(h.navigator.last(), Some(Navigation::Assign(request.url.clone())));
        assert_eq!(h.orchestrator.phase(), FlowPhase::AwaitingCallback);
    }

    #[test]
    fn test_login_records_pending_login() {
        let h = harness(StaticFetcher::ok());

        let request = h.orchestrator.login().unwrap();
        let pending = h.store.take_pending_login().unwrap().unwrap();
        assert_eq!(pending.state, request.state);
        assert_eq!(pending.nonce, request.nonce);
    }

    #[tokio::test]
    async fn test_provider_error_persists_nothing() {
        let h = harness(StaticFetcher::ok());
        let outcome = h
            .orchestrator
            .process_callback("", "error=access_denied")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CallbackOutcome::Rejected(RejectionReason::ProviderError(
                "access_denied".to_string()
            ))
        );
        assert!(h.store.load_session().unwrap().is_empty());
        assert_eq!(
            h.navigator.last(),
            Some(Navigation::Assign("/index.html?error=access_denied".to_string()))
        );
    }

    #[tokio::test]
    async fn test_error_description_is_preferred() {
        let h = harness(StaticFetcher::ok());
        let outcome = h
            .orchestrator
            .process_callback("error=access_denied&error_description=User%20said%20no", "")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CallbackOutcome::Rejected(RejectionReason::ProviderError("User said no".to_string()))
        );
    }

    #[tokio::test]
    async fn test_provider_error_wins_over_tokens() {
        let h = harness(StaticFetcher::ok());
        let (access, id) = valid_pair();
        let fragment = format!("{}&error=server_error", callback_fragment(&access, &id));

        let outcome = h.orchestrator.process_callback(&fragment, "").await.unwrap();

        assert!(matches!(
            outcome,
            CallbackOutcome::Rejected(RejectionReason::ProviderError(_))
        ));
        assert!(h.store.load_session().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_callback_without_tokens_is_rejected() {
        let h = harness(StaticFetcher::ok());
        let outcome = h
            .orchestrator
            .process_callback("", "authorizing=true")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CallbackOutcome::Rejected(RejectionReason::MissingTokens)
        );
    }

    #[tokio::test]
    async fn test_callback_with_single_token_is_malformed() {
        let h = harness(StaticFetcher::ok());
        let (access, _) = valid_pair();
        let outcome = h
            .orchestrator
            .process_callback(&format!("access_token={access}"), "")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CallbackOutcome::Rejected(RejectionReason::MalformedToken)
        );
    }

    #[tokio::test]
    async fn test_verified_callback_persists_and_navigates() {
        let h = harness(StaticFetcher::ok());
        let (access, id) = valid_pair();
        let fragment = format!("{}&session_state=abc", callback_fragment(&access, &id));

        let outcome = h
            .orchestrator
            .process_callback(&fragment, "authorizing=true")
            .await
            .unwrap();

        assert_eq!(outcome, CallbackOutcome::Authenticated { reloaded: false });
        let session = h.store.load_session().unwrap();
        assert_eq!(session.access_token.as_deref(), Some(access.as_str()));
        assert_eq!(session.id_token.as_deref(), Some(id.as_str()));
        assert_eq!(session.session_state.as_deref(), Some("abc"));
        assert_eq!(
            h.navigator.last(),
            Some(Navigation::Assign("/index.html".to_string()))
        );
        assert_eq!(h.orchestrator.check_status().unwrap(), AuthState::Authenticated);
    }

    #[tokio::test]
    async fn test_refresh_flag_reloads_instead_of_navigating() {
        let h = harness(StaticFetcher::ok());
        let (access, id) = valid_pair();

        let outcome = h
            .orchestrator
            .process_callback(&callback_fragment(&access, &id), "refresh=true")
            .await
            .unwrap();

        assert_eq!(outcome, CallbackOutcome::Authenticated { reloaded: true });
        assert_eq!(h.navigator.last(), Some(Navigation::Reload));
    }

    #[tokio::test]
    async fn test_discovery_failure_is_rejected() {
        let h = harness(StaticFetcher::failing());
        let (access, id) = valid_pair();

        let outcome = h
            .orchestrator
            .process_callback(&callback_fragment(&access, &id), "")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CallbackOutcome::Rejected(RejectionReason::DiscoveryFetchFailed)
        );
        assert!(h.store.load_session().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_verification_carries_visible_error() {
        let h = harness(StaticFetcher::with_issuer("https://elsewhere.example.com"));
        let (access, id) = valid_pair();

        let outcome = h
            .orchestrator
            .process_callback(&callback_fragment(&access, &id), "")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CallbackOutcome::Rejected(RejectionReason::IssuerMismatch)
        );
        let Some(Navigation::Assign(location)) = h.navigator.last() else {
            panic!("expected a navigation to the entry point");
        };
        assert!(location.starts_with("/index.html?error="));
        assert!(h.store.load_session().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_callback_consumes_pending_login_without_enforcement() {
        let h = harness(StaticFetcher::ok());
        h.orchestrator.login().unwrap();
        let (access, id) = valid_pair();

        let outcome = h
            .orchestrator
            .process_callback(&callback_fragment(&access, &id), "")
            .await
            .unwrap();

        assert_eq!(outcome, CallbackOutcome::Authenticated { reloaded: false });
        assert!(h.store.take_pending_login().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_enforced_state_mismatch_is_rejected() {
        let mut h = harness(StaticFetcher::ok());
        h.orchestrator = h.orchestrator.enforce_state_and_nonce(true);
        h.orchestrator.login().unwrap();
        let (access, id) = valid_pair();
        let fragment = format!("{}&state=forged", callback_fragment(&access, &id));

        let outcome = h.orchestrator.process_callback(&fragment, "").await.unwrap();

        assert_eq!(
            outcome,
            CallbackOutcome::Rejected(RejectionReason::StateMismatch)
        );
        assert!(h.store.take_pending_login().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_enforced_callback_without_login_is_rejected() {
        let mut h = harness(StaticFetcher::ok());
        h.orchestrator = h.orchestrator.enforce_state_and_nonce(true);
        let (access, id) = valid_pair();
        let fragment = format!("{}&state=unsolicited", callback_fragment(&access, &id));

        let outcome = h.orchestrator.process_callback(&fragment, "").await.unwrap();

        assert_eq!(
            outcome,
            CallbackOutcome::Rejected(RejectionReason::StateMismatch)
        );
        assert!(h.store.load_session().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_navigates_even_when_session_unreadable() {
        let navigator = Arc::new(RecordingNavigator::new());
        let orchestrator = AuthOrchestrator::new(
            test_client_config(),
            TokenStore::new(Arc::new(UnreadableSession::default())),
            navigator.clone(),
            Arc::new(StaticFetcher::ok()),
        );

        let outcome = orchestrator
            .process_callback("", "error=access_denied")
            .await
            .unwrap();

        assert!(matches!(outcome, CallbackOutcome::Rejected(_)));
        assert_eq!(
            navigator.last(),
            Some(Navigation::Assign("/index.html?error=access_denied".to_string()))
        );
        assert_eq!(orchestrator.phase(), FlowPhase::Idle);
    }

    #[tokio::test]
    async fn test_enforced_state_and_nonce_accepts_matching_callback() {
        let mut h = harness(StaticFetcher::ok());
        h.orchestrator = h.orchestrator.enforce_state_and_nonce(true);
        let request = h.orchestrator.login().unwrap();

        let access = make_access_token(Utc::now().timestamp() + 3600);
        let id = id_token_for(&access, json!({"nonce": request.nonce}));
        let fragment = format!(
            "{}&state={}",
            callback_fragment(&access, &id),
            request.state
        );

        let outcome = h.orchestrator.process_callback(&fragment, "").await.unwrap();
        assert_eq!(outcome, CallbackOutcome::Authenticated { reloaded: false });
    }

    #[tokio::test]
    async fn test_enforced_nonce_mismatch_is_rejected() {
        let mut h = harness(StaticFetcher::ok());
        h.orchestrator = h.orchestrator.enforce_state_and_nonce(true);
        let request = h.orchestrator.login().unwrap();

        let access = make_access_token(Utc::now().timestamp() + 3600);
        let id = id_token_for(&access, json!({"nonce": "replayed"}));
        let fragment = format!(
            "{}&state={}",
            callback_fragment(&access, &id),
            request.state
        );

        let outcome = h.orchestrator.process_callback(&fragment, "").await.unwrap();
        assert_eq!(
            outcome,
            CallbackOutcome::Rejected(RejectionReason::NonceMismatch)
        );
    }

    #[tokio::test]
    async fn test_process_auth_splits_location() {
        let h = harness(StaticFetcher::ok());
        let (access, id) = valid_pair();
        let location = format!(
            "http://localhost:7000/?authorizing=true#{}",
            callback_fragment(&access, &id)
        );

        let outcome = h.orchestrator.process_auth(&location).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::Authenticated { reloaded: false });
    }

    #[test]
    fn test_refresh_auth_leaves_session_untouched() {
        let h = harness(StaticFetcher::ok());
        let (access, id) = valid_pair();
        h.store.save(TokenKind::AccessToken, &access).unwrap();
        h.store.save(TokenKind::IdToken, &id).unwrap();

        h.orchestrator.refresh_auth().unwrap();

        assert_eq!(h.orchestrator.check_status().unwrap(), AuthState::Authenticated);
        assert!(h.navigator.history().is_empty());
    }

    #[test]
    fn test_logout_clears_session() {
        let h = harness(StaticFetcher::ok());
        let (access, id) = valid_pair();
        h.store.save(TokenKind::AccessToken, &access).unwrap();
        h.store.save(TokenKind::IdToken, &id).unwrap();

        h.orchestrator.logout().unwrap();

        assert!(!h.orchestrator.is_authenticated().unwrap());
        assert!(!h.orchestrator.is_authorized().unwrap());
        assert_eq!(h.orchestrator.check_status().unwrap(), AuthState::LoggedOut);
    }

    #[test]
    fn test_error_location_separator() {
        let reason = RejectionReason::ProviderError("a b".to_string());
        assert_eq!(error_location("/index.html", &reason), "/index.html?error=a%20b");
        assert_eq!(
            error_location("/app?tab=1", &reason),
            "/app?tab=1&error=a%20b"
        );
    }
}
