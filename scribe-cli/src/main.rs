use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "scribe", about = "Dictation learning engine")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply learned patterns and preferences to refined text
    Apply(commands::apply::ApplyArgs),
    /// Show which feedback prompt a dictation would get
    Decide(commands::decide::DecideArgs),
    /// Record an edit review of a refinement
    Review(commands::review::ReviewArgs),
    /// Record a choice between two refinements
    Choose(commands::choose::ChooseArgs),
    /// Show learning progress
    Stats(commands::stats::StatsArgs),
    /// List learned patterns
    Patterns(commands::patterns::PatternsArgs),
    /// Stop applying a learned pattern
    Forget(commands::patterns::ForgetArgs),
    /// Replay queued writes to the backend
    Sync(commands::sync::SyncArgs),
    /// Delete all learning data for the configured user
    Reset(commands::reset::ResetArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Apply(args) => commands::apply::run(args).await,
        Commands::Decide(args) => commands::decide::run(args).await,
        Commands::Review(args) => commands::review::run(args).await,
        Commands::Choose(args) => commands::choose::run(args).await,
        Commands::Stats(args) => commands::stats::run(args).await,
        Commands::Patterns(args) => commands::patterns::run(args).await,
        Commands::Forget(args) => commands::patterns::forget(args).await,
        Commands::Sync(args) => commands::sync::run(args).await,
        Commands::Reset(args) => commands::reset::run(args).await,
        Commands::Config(args) => commands::config::run(args),
    }
}
