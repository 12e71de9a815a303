use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use super::load_config;
use crate::cli::output::{ChunkPreview, get_formatter};
use crate::models::OutputFormat;
use crate::services::{LocalIngestor, Preprocessor, chunking_stats};

#[derive(Debug, Args)]
pub struct ChunkArgs {
    /// File to chunk (pdf, json, csv, md or txt)
    pub file: PathBuf,

    /// Show at most this many chunks
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

pub async fn handle_chunk(
    args: ChunkArgs,
    config_path: Option<&Path>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate().context("invalid configuration")?;

    let ingestor = LocalIngestor::from_config(&config.ingest);
    let mut documents = ingestor
        .read_file(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let preprocessor = Preprocessor::from_config(&config);
    preprocessor.transform(&mut documents);

    let mut chunks = preprocessor.chunker().chunk_all(&documents);
    let stats = chunking_stats(documents.len(), &chunks);
    if verbose {
        eprintln!("{} document(s), {} chunk(s)", documents.len(), chunks.len());
    }
    if let Some(limit) = args.limit {
        chunks.truncate(limit);
    }

    let preview = ChunkPreview {
        file: args.file.display().to_string(),
        stats,
        chunks,
    };
    print!("{}", get_formatter(format).format_chunks(&preview));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Config;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("config.toml");
        Config::default().save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn test_chunk_preview_of_text_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("specials.md");
        std::fs::write(&file, "DESSERTS\nTiramisu $9\nPanna Cotta $8\nGelato $6").unwrap();

        let args = ChunkArgs {
            file,
            limit: Some(1),
        };
        handle_chunk(args, Some(&write_config(&dir)), OutputFormat::Json, false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unsupported_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("photo.png");
        std::fs::write(&file, [0u8, 1, 2]).unwrap();

        let args = ChunkArgs { file, limit: None };
        assert!(
            handle_chunk(args, Some(&write_config(&dir)), OutputFormat::Text, false)
                .await
                .is_err()
        );
    }
}
