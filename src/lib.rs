//! implicit-oidc - OpenID Connect implicit-flow client library
//!
//! This library drives a user agent through the OAuth 2.0 / OpenID Connect
//! implicit flow, validates the returned ID token and access token against
//! the server's discovery document, and persists the session per origin.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: Storage, redirect construction, callback parsing, token
//!   decoding, validation and the orchestrating state machine
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: CLI command handlers and the composition root
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use implicit_oidc::auth::navigator::RecordingNavigator;
//! use implicit_oidc::commands::build_orchestrator_with_navigator;
//! use implicit_oidc::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let orchestrator =
//!         build_orchestrator_with_navigator(&config, Arc::new(RecordingNavigator::new()))?;
//!     println!("{}", orchestrator.check_status()?);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use auth::{AuthOrchestrator, AuthState, CallbackOutcome};
pub use config::Config;
pub use error::{OidcError, RejectionReason, Result};

#[cfg(test)]
pub mod test_utils;
