//! `vantage` command-line entry point.

mod cli;
mod error;

use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};
use vantage::{RefreshJob, Symbol, VantageClient, VantageConfig, bulk_to_json};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vantage=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();

    let config = VantageConfig::from_env()?;
    let client = VantageClient::from_config(&config).await?;

    let shutdown = client.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling pending requests");
            shutdown.cancel();
        }
    });

    let (output, failures) = execute(&client, cli.command).await?;

    let rendered = if cli.compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    println!("{rendered}");

    if failures > 0 {
        return Ok(ExitCode::from(3));
    }
    Ok(ExitCode::SUCCESS)
}

/// Run one command, returning its JSON output and the number of failed items.
async fn execute(client: &VantageClient, command: Command) -> Result<(Value, usize), CliError> {
    let fetched = match command {
        Command::Quote { symbol } => client.quote(&symbol).await?,
        Command::Overview { symbol } => client.company_overview(&symbol).await?,
        Command::Sectors => client.sector_performance().await?,
        Command::Income { symbol } => client.income_statement(&symbol).await?,
        Command::Bulk { symbols, function } => {
            let symbols: Vec<Symbol> = symbols.into_iter().map(Symbol::new).collect();
            let bulk = client.bulk_series(&symbols, function.as_deref()).await?;
            let failures = bulk.failure_count();
            info!(
                requested = bulk.len(),
                failed = failures,
                "Bulk fetch complete"
            );
            return Ok((bulk_to_json(bulk), failures));
        }
        Command::Job { json } => {
            let job: RefreshJob =
                serde_json::from_str(&json).map_err(|e| CliError::Job(e.to_string()))?;
            return Ok((client.run_job(&job).await?, 0));
        }
    };
    info!(from_cache = fetched.from_cache, "Fetch complete");
    Ok((fetched.payload, 0))
}
