//! Vigil command-line entry point.
//!
//! Runs a single alerting request against a local DuckDB store and prints
//! the response as JSON.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use vigil_cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let response = vigil_cli::run(&cli).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
