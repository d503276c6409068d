use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "quitboard-cli", version, about = "Quitboard CLI")]
struct Cli {
    /// Configuration file (defaults to config.toml in the data dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file override.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Member management
    Member {
        #[command(subcommand)]
        action: commands::member::MemberAction,
    },
    /// Register a member (date + price in one shot)
    Register(commands::register::RegisterArgs),
    /// Leaderboard operations
    Board {
        #[command(subcommand)]
        action: commands::board::BoardAction,
    },
    /// Run the recurring scheduler in the foreground
    Serve,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let ctx = common::Context {
        config: cli.config,
        database: cli.database,
    };

    let result = match cli.command {
        Commands::Member { action } => commands::member::run(&ctx, action).await,
        Commands::Register(args) => commands::register::run(&ctx, args).await,
        Commands::Board { action } => commands::board::run(&ctx, action).await,
        Commands::Serve => commands::serve::run(&ctx).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
