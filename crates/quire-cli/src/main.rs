//! CLI entry point - the composition root.
//!
//! Installs logging, loads `.env`, parses arguments and dispatches to the
//! command handlers.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use quire_cli::error::exit_code_for;
use quire_cli::{Cli, Commands, handlers};

#[tokio::main]
async fn main() {
    // Load environment variables (API key, base URL) before clap reads them
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Read(args) => handlers::read::execute(args).await,
        Commands::Segment(args) => handlers::segment::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code_for(&e));
    }
}
