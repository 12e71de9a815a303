use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};

use super::load_config;
use crate::cli::output::{Formatter, get_formatter};
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a config file with default settings")]
    Init {
        #[arg(long, short = 'f', help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show the effective configuration")]
    Show,
    #[command(about = "Show the configuration file path")]
    Path,
}

pub async fn handle_config(
    cmd: ConfigCommand,
    config_path: Option<&Path>,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        ConfigCommand::Init { force } => handle_init(config_path, force, formatter.as_ref()),
        ConfigCommand::Show => handle_show(config_path, format),
        ConfigCommand::Path => handle_path(config_path, formatter.as_ref()),
    }
}

fn target_path(config_path: Option<&Path>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::config_path()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory")),
    }
}

fn handle_init(config_path: Option<&Path>, force: bool, formatter: &dyn Formatter) -> Result<()> {
    let path = target_path(config_path)?;
    if path.exists() && !force {
        anyhow::bail!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    Config::default()
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!(
        "{}",
        formatter.format_message(&format!("Created config at {}", path.display()))
    );
    Ok(())
}

fn handle_show(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = load_config(config_path)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Markdown => {
            println!("```toml\n{}```", toml::to_string_pretty(&config)?);
        }
        OutputFormat::Text => print!("{}", toml::to_string_pretty(&config)?),
    }
    Ok(())
}

fn handle_path(config_path: Option<&Path>, formatter: &dyn Formatter) -> Result<()> {
    let path = target_path(config_path)?;
    let state = if path.exists() { "exists" } else { "not created" };
    println!(
        "{}",
        formatter.format_message(&format!("{} ({state})", path.display()))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.toml");

        handle_config(ConfigCommand::Init { force: false }, Some(&path), OutputFormat::Text, false)
            .await
            .unwrap();
        assert!(path.exists());

        let again =
            handle_config(ConfigCommand::Init { force: false }, Some(&path), OutputFormat::Text, false)
                .await;
        assert!(again.is_err());

        handle_config(ConfigCommand::Init { force: true }, Some(&path), OutputFormat::Text, false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_written_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        handle_config(ConfigCommand::Init { force: false }, Some(&path), OutputFormat::Text, false)
            .await
            .unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.collections.len(), Config::default().collections.len());
        loaded.validate().unwrap();
    }
}
