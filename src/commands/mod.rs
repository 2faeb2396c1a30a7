/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint and the
composition root that wires configuration, storage, navigation and
discovery into an [`AuthOrchestrator`].

- `login`    -- Start the implicit flow
- `callback` -- Verify and store the tokens of a redirect target
- `status`   -- Report the session status
- `session`  -- Logout and silent renewal
*/

use crate::auth::discovery::HttpDiscoveryFetcher;
use crate::auth::navigator::{Navigator, SystemBrowserNavigator};
use crate::auth::storage::SledStorage;
use crate::auth::token_store::TokenStore;
use crate::auth::AuthOrchestrator;
use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;

/// Builds an orchestrator backed by the sled session database and the
/// system browser.
///
/// # Errors
///
/// Returns error if the storage origin cannot be derived or the database
/// cannot be opened
pub fn build_orchestrator(config: &Config, open_browser: bool) -> Result<AuthOrchestrator> {
    let navigator: Arc<dyn Navigator> = Arc::new(SystemBrowserNavigator::new(open_browser));
    build_orchestrator_with_navigator(config, navigator)
}

/// Like [`build_orchestrator`] with a caller-supplied navigator.
pub fn build_orchestrator_with_navigator(
    config: &Config,
    navigator: Arc<dyn Navigator>,
) -> Result<AuthOrchestrator> {
    let origin = config.storage_origin()?;
    let path = config.storage_path()?;
    tracing::debug!("Opening session store at {} for {}", path.display(), origin);

    let storage = SledStorage::open(&path, &origin)?;
    let store = TokenStore::new(Arc::new(storage));
    let fetcher = HttpDiscoveryFetcher::new(Arc::new(reqwest::Client::new()));

    Ok(AuthOrchestrator::new(
        config.client.clone(),
        store,
        navigator,
        Arc::new(fetcher),
    )
    .with_entry_point(config.app.entry_point.clone())
    .enforce_state_and_nonce(config.security.enforce_state_and_nonce))
}

// Login command handler
pub mod login {
    //! Issues the authorization request and navigates to it.

    use super::*;

    /// Start the implicit flow
    pub fn run_login(orchestrator: &AuthOrchestrator) -> Result<()> {
        let request = orchestrator.login()?;
        tracing::debug!("Issued login request with state {}", request.state);
        println!(
            "After signing in, pass the URL you are redirected to to `implicit-oidc callback`."
        );
        Ok(())
    }
}

// Callback command handler
pub mod callback {
    //! Processes a redirect target URL.

    use super::*;
    use crate::auth::CallbackOutcome;

    /// Verify the tokens carried by `url` and store them
    ///
    /// # Errors
    ///
    /// Returns the rejection reason as an error when the callback is not
    /// accepted, so the process exits unsuccessfully
    pub async fn run_callback(orchestrator: &AuthOrchestrator, url: &str) -> Result<()> {
        match orchestrator.process_auth(url).await? {
            CallbackOutcome::Authenticated { reloaded } => {
                if reloaded {
                    tracing::debug!("Callback requested a reload");
                }
                println!("Signed in.");
                Ok(())
            }
            CallbackOutcome::Rejected(reason) => Err(reason.into()),
        }
    }
}

// Status command handler
pub mod status {
    //! Reports the derived session status and the four shell booleans.

    use super::*;
    use crate::auth::AuthState;
    use serde::Serialize;

    /// Snapshot of the session as the shell sees it
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct StatusReport {
        pub state: AuthState,
        pub is_authenticated: bool,
        pub is_authorized: bool,
        pub authentication_is_expired: bool,
        pub authorization_is_expired: bool,
    }

    /// Collects a [`StatusReport`] from the store
    pub fn collect(orchestrator: &AuthOrchestrator) -> Result<StatusReport> {
        Ok(StatusReport {
            state: orchestrator.check_status()?,
            is_authenticated: orchestrator.is_authenticated()?,
            is_authorized: orchestrator.is_authorized()?,
            authentication_is_expired: orchestrator.authentication_is_expired()?,
            authorization_is_expired: orchestrator.authorization_is_expired()?,
        })
    }

    /// Print the session status
    pub fn run_status(orchestrator: &AuthOrchestrator, json: bool) -> Result<()> {
        let report = collect(orchestrator)?;

        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("Status: {}", report.state);
        println!("  authenticated:             {}", report.is_authenticated);
        println!("  authorized:                {}", report.is_authorized);
        println!(
            "  authentication expired:    {}",
            report.authentication_is_expired
        );
        println!(
            "  authorization expired:     {}",
            report.authorization_is_expired
        );
        Ok(())
    }
}

// Logout / refresh handlers
pub mod session {
    //! Session maintenance commands.

    use super::*;

    /// Forget the stored session
    pub fn run_logout(orchestrator: &AuthOrchestrator) -> Result<()> {
        orchestrator.logout()?;
        println!("Signed out.");
        Ok(())
    }

    /// Silent renewal; currently reports that it is unavailable
    pub fn run_refresh(orchestrator: &AuthOrchestrator) -> Result<()> {
        orchestrator.refresh_auth()?;
        println!("Silent renewal is not implemented; run `implicit-oidc login` to sign in again.");
        Ok(())
    }
}
