//! Command-line interface definition for implicit-oidc
//!
//! This module defines the CLI structure using clap's derive API. The CLI is
//! a small shell over the orchestrator: it starts a login, hands redirect
//! targets back for verification, and reports the session status.

use clap::{Parser, Subcommand};

/// implicit-oidc - OpenID Connect implicit-flow client
///
/// Sign in against an OpenID Connect provider, verify the tokens returned on
/// the redirect, and keep the session on disk.
#[derive(Parser, Debug, Clone)]
#[command(name = "implicit-oidc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "IMPLICIT_OIDC_CONFIG", default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the session database location
    #[arg(long)]
    pub storage_path: Option<String>,

    /// Print navigation targets without opening a browser
    #[arg(long)]
    pub no_browser: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Send the browser to the authorization server
    Login,

    /// Verify and store the tokens carried by a redirect URL
    Callback {
        /// The full URL the authorization server redirected to
        url: String,
    },

    /// Show whether the stored session is authenticated and authorized
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forget the stored session
    Logout,

    /// Renew the session without user interaction
    Refresh,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            storage_path: None,
            no_browser: false,
            command: Commands::Status { json: false },
        }
    }
}
