//! Keyroute CLI — entry point.
//!
//! # Commands
//!
//! - `keyroute status` — credential status per endpoint and deployment groups
//! - `keyroute resolve ENDPOINT [-m MODEL]` — run the pipeline, print the emitted config
//! - `keyroute onboard` — write a default config file

mod helpers;
mod onboard;
mod resolve_cmd;
mod status;

use anyhow::Result;
use clap::{Parser, Subcommand};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Keyroute — resolve chat endpoint credentials and client configs
#[derive(Parser)]
#[command(name = "keyroute", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.keyroute/config.json)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard,

    /// Show credential status per endpoint
    Status,

    /// Resolve the client config for one endpoint/model
    Resolve(resolve_cmd::ResolveArgs),
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref().map(helpers::expand_tilde);

    match cli.command {
        Commands::Onboard => onboard::run(config_path.as_deref()),
        Commands::Status => status::run(config_path.as_deref()),
        Commands::Resolve(args) => {
            init_logging(args.logs);
            resolve_cmd::run(config_path.as_deref(), args).await
        }
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("keyroute=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
