//! ml-primer - Main Entry Point

use clap::Parser;
use ml_primer::cli::{cmd_compare_scaling, cmd_search, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ml_primer=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::CompareScaling(args) => cmd_compare_scaling(&args)?,
        Commands::Search(args) => cmd_search(&args)?,
    }

    Ok(())
}
