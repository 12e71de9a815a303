use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use menuprep::cli::commands::{handle_chunk, handle_config, handle_run, handle_validate};
use menuprep::cli::{Cli, Commands};
use menuprep::error::PipelineError;
use menuprep::models::OutputFormat;

fn init_tracing(verbose: bool) {
    let default = if verbose { "menuprep=debug,info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = cli.format.unwrap_or_default();
    let verbose = cli.verbose;
    let config_path = cli.config;

    tokio::select! {
        result = run_command(cli.command, config_path.as_deref(), format, verbose) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::warn!("received shutdown signal");
            eprintln!("\n{}", PipelineError::Interrupted);
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }
    }

    Ok(())
}

async fn run_command(
    command: Commands,
    config_path: Option<&Path>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    match command {
        Commands::Run(args) => {
            handle_run(args, config_path, format, verbose).await?;
        }
        Commands::Validate(args) => {
            handle_validate(args, config_path, format, verbose).await?;
        }
        Commands::Chunk(args) => {
            handle_chunk(args, config_path, format, verbose).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd, config_path, format, verbose).await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
