//! BetterClaw CLI — the main entry point.
//!
//! Commands:
//! - `onboard`  — Initialize config & state directory
//! - `daemon`   — Start the triage daemon (gateway + schedulers)
//! - `status`   — Human-readable device summary
//! - `context`  — Print the agent-facing context payload

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "betterclaw",
    about = "BetterClaw — device telemetry triage for AI agent sessions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and the state directory
    Onboard,

    /// Start the triage daemon
    Daemon,

    /// Show a device status summary
    Status,

    /// Print the agent-facing context payload
    Context {
        /// Sections to include: device, activity, patterns, meta (default all)
        #[arg(short, long)]
        include: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Daemon => commands::daemon::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Context { include } => commands::context::run(include).await?,
    }

    Ok(())
}
