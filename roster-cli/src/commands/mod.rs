//! CLI command implementations

pub mod migrate;
pub mod register;
pub mod serve;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use roster_core::config::Config;
use roster_core::RosterContext;

/// Resolve the roster directory: `--data-dir` / `ROSTER_DIR`, else `~/.roster`
pub fn get_roster_dir(data_dir: Option<PathBuf>) -> Result<PathBuf> {
    match data_dir {
        Some(dir) => Ok(dir),
        None => dirs::home_dir()
            .map(|home| home.join(".roster"))
            .ok_or_else(|| anyhow!("Could not find home directory; pass --data-dir")),
    }
}

/// Load settings from the roster directory, creating the directory if needed
pub fn load_config(roster_dir: &Path) -> Result<Config> {
    std::fs::create_dir_all(roster_dir)
        .with_context(|| format!("Failed to create roster directory: {:?}", roster_dir))?;

    Config::load(roster_dir)
        .with_context(|| format!("Failed to load settings from {:?}", roster_dir))
}

/// Build the context (opens the store and applies migrations)
pub async fn get_context(config: Config) -> Result<RosterContext> {
    RosterContext::with_config(config)
        .await
        .context("Failed to open account store")
}
