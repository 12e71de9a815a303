use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use super::load_config;
use crate::cli::output::{ValidationSummary, get_formatter};
use crate::models::OutputFormat;
use crate::services::{LocalIngestor, Preprocessor};

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Storage directory to check
    #[arg(long, short = 's')]
    pub storage: Option<PathBuf>,
}

pub async fn handle_validate(
    args: ValidateArgs,
    config_path: Option<&Path>,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(storage) = args.storage {
        config.ingest.storage_dir = storage;
    }
    config.validate().context("invalid configuration")?;

    let (mut documents, _) = LocalIngestor::from_config(&config.ingest)
        .ingest_all()
        .context("ingestion failed")?;

    let preprocessor = Preprocessor::from_config(&config);
    preprocessor.transform(&mut documents);

    let summary = ValidationSummary {
        batch: preprocessor.validator().validate_batch(&documents),
        coverage: preprocessor.validator().metadata_coverage(&documents),
    };

    print!("{}", get_formatter(format).format_validation(&summary));
    Ok(())
}
