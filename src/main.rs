//! mofcap - Main Entry Point

use clap::Parser;

use mofcap::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mofcap=info".into()),
        )
        .init();

    let cli = Cli::parse();
    cli::execute(cli)?;
    Ok(())
}
