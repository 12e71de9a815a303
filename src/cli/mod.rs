//! Command-line front end.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::OutputFormat;

/// Clean, enrich, chunk and index restaurant documents for semantic retrieval.
#[derive(Debug, Parser)]
#[command(name = "menuprep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        short = 'c',
        global = true,
        env = "MENUPREP_CONFIG",
        help = "Path to a config.toml"
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full pipeline over the storage directory and index the result
    Run(commands::RunArgs),

    /// Report metadata quality of the storage directory without indexing
    Validate(commands::ValidateArgs),

    /// Preview the chunks produced for one file
    Chunk(commands::ChunkArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IndexMode;

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::parse_from([
            "menuprep", "--format", "json", "run", "--mode", "single", "--dry-run",
        ]);
        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.mode, Some(IndexMode::Single));
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_chunk_requires_file() {
        assert!(Cli::try_parse_from(["menuprep", "chunk"]).is_err());
        assert!(Cli::try_parse_from(["menuprep", "chunk", "menu.pdf"]).is_ok());
    }
}
