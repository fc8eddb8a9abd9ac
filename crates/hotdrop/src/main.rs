//! hotdrop CLI - hot deploy companion for Liferay on Tomcat.
//!
//! Provides commands for:
//! - `serve`: Watch the workspace and server, deploy and live reload
//! - `diff`: Compare an artifact's libraries with a running copy
//! - `scan`: List workspace applications and deploy locations

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{DiffArgs, ScanArgs, ServeArgs};
use output::Output;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// hotdrop - hot deploy companion for Liferay on Tomcat.
#[derive(Parser)]
#[command(name = "hotdrop", version, about)]
struct Cli {
    /// Show debug logs.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the workspace and server; deploy artifacts and reload browsers.
    Serve(ServeArgs),
    /// Classify an artifact's libraries against a runtime directory.
    Diff(DiffArgs),
    /// List workspace applications and deploy locations.
    Scan(ScanArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables DEBUG, --quiet only ERROR, otherwise RUST_LOG or INFO
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Serve(args) => {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
            rt.block_on(args.execute(VERSION))
        }
        Commands::Diff(args) => args.execute(),
        Commands::Scan(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
