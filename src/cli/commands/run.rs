//! Full pipeline run.

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::load_config;
use crate::cli::output::get_formatter;
use crate::models::{EmbeddingProviderKind, IndexMode, OutputFormat, VectorDriver};
use crate::services::{LocalIngestor, Pipeline, create_provider, create_store};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Collection layout: multi (one per document kind) or single
    #[arg(long, short = 'm')]
    pub mode: Option<IndexMode>,

    /// Storage directory holding pdf/, json/, csv/ and text files
    #[arg(long, short = 's')]
    pub storage: Option<PathBuf>,

    /// Directory the run report is written to
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Embed locally and index into memory instead of calling external services
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn handle_run(
    args: RunArgs,
    config_path: Option<&Path>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(mode) = args.mode {
        config.indexing.mode = mode;
    }
    if let Some(storage) = args.storage {
        config.ingest.storage_dir = storage;
    }
    if let Some(output) = args.output {
        config.report.output_dir = output;
    }
    if args.dry_run {
        config.embedding.provider = EmbeddingProviderKind::Hash;
        config.vector_store.driver = VectorDriver::Memory;
    }
    config.validate().context("invalid configuration")?;

    let formatter = get_formatter(format);
    let embedder =
        create_provider(&config.embedding).context("failed to set up embedding provider")?;
    let store = create_store(&config.vector_store).context("failed to set up vector store")?;

    let progress = spinner(format == OutputFormat::Text && !verbose);
    progress.set_message("Ingesting documents...");

    let ingestor = LocalIngestor::from_config(&config.ingest);
    let (documents, ingestion) = ingestor.ingest_all().context("ingestion failed")?;
    if documents.is_empty() {
        progress.finish_and_clear();
        println!(
            "{}",
            formatter.format_message(&format!(
                "No documents found in {}",
                ingestor.storage_dir().display()
            ))
        );
        return Ok(());
    }

    progress.set_message(format!(
        "Processing {} documents ({} mode)...",
        documents.len(),
        config.indexing.mode
    ));
    let pipeline = Pipeline::new(&config, embedder, store);
    let result = pipeline.run(documents, ingestion).await;
    progress.finish_and_clear();
    let report = result.context("pipeline run failed")?;

    let saved = report
        .save(&config.report.output_dir)
        .context("failed to save run report")?;

    print!("{}", formatter.format_run_report(&report));
    if format == OutputFormat::Json {
        println!();
    } else {
        println!(
            "{}",
            formatter.format_message(&format!("Results saved to: {}", saved.display()))
        );
    }

    Ok(())
}

fn spinner(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Config;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("config.toml");
        Config::default().save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn test_dry_run_writes_report() {
        let storage = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let config = write_config(&output);
        let reports = output.path().join("reports");
        fs::create_dir_all(storage.path().join("doc")).unwrap();
        fs::write(
            storage.path().join("doc/allergens.txt"),
            "All fried items share oil with shellfish.",
        )
        .unwrap();

        let args = RunArgs {
            mode: None,
            storage: Some(storage.path().to_path_buf()),
            output: Some(reports.clone()),
            dry_run: true,
        };
        handle_run(args, Some(&config), OutputFormat::Json, true)
            .await
            .unwrap();

        let saved: Vec<_> = fs::read_dir(&reports).unwrap().collect();
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_storage_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir);
        let args = RunArgs {
            mode: None,
            storage: Some(PathBuf::from("/definitely/not/here")),
            output: None,
            dry_run: true,
        };
        assert!(
            handle_run(args, Some(&config), OutputFormat::Json, true)
                .await
                .is_err()
        );
    }
}
