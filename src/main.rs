//! implicit-oidc - OpenID Connect implicit-flow client
//!
#![doc = "Main entry point for the implicit-oidc command-line shell."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use implicit_oidc::cli::{Cli, Commands};
use implicit_oidc::commands;
use implicit_oidc::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let orchestrator = commands::build_orchestrator(&config, !cli.no_browser)?;

    match cli.command {
        Commands::Login => {
            tracing::info!("Starting login");
            commands::login::run_login(&orchestrator)
        }
        Commands::Callback { url } => {
            tracing::info!("Processing redirect callback");
            commands::callback::run_callback(&orchestrator, &url).await
        }
        Commands::Status { json } => commands::status::run_status(&orchestrator, json),
        Commands::Logout => commands::session::run_logout(&orchestrator),
        Commands::Refresh => commands::session::run_refresh(&orchestrator),
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output for
/// this crate.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "implicit_oidc=debug"
    } else {
        "implicit_oidc=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
