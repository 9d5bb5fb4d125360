use anyhow::Result;
use clap::{Parser, Subcommand};

mod client;
mod commands;
mod config;

#[derive(Parser)]
#[command(name = "courier", about = "Multi-tenant messaging sessions with paced delivery")]
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
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Run the courier server
    Serve(commands::serve::ServeArgs),
    /// Manage sessions on a running server
    Sessions(commands::sessions::SessionsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Config(args) => commands::config::run(args),
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::Sessions(args) => commands::sessions::run(args).await,
    }
}
