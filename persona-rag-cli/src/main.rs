//! `persona-rag`: ingest a persona document and ask it questions.

mod cli;
mod commands;
mod telemetry;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Feed .env values to clap's `env` fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    telemetry::init(cli.verbose, cli.log_format)?;

    commands::run(cli.command).await
}
