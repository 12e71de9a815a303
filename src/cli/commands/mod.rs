mod chunk;
mod config;
mod run;
mod validate;

pub use chunk::ChunkArgs;
pub use config::ConfigCommand;
pub use run::RunArgs;
pub use validate::ValidateArgs;

pub use chunk::handle_chunk;
pub use config::handle_config;
pub use run::handle_run;
pub use validate::handle_validate;

use anyhow::{Context, Result};
use std::path::Path;

use crate::models::Config;

/// Load configuration from `path`, or the user config file when absent.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load(path).context("failed to load configuration")?;
    Ok(config)
}
