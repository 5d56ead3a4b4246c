//! Migrate command - apply pending schema migrations

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use super::{get_context, get_roster_dir, load_config};

pub async fn run(data_dir: Option<PathBuf>, json: bool) -> Result<ExitCode> {
    let roster_dir = get_roster_dir(data_dir)?;
    let config = load_config(&roster_dir)?;

    // Opening the context applies whatever is pending
    let ctx = get_context(config).await?;
    let result = &ctx.migrations;

    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(ExitCode::SUCCESS);
    }

    if result.applied.is_empty() {
        println!(
            "{} ({} already applied)",
            "Schema is up to date".green(),
            result.already_applied
        );
    } else {
        for name in &result.applied {
            println!("{} {}", "Applied".green(), name);
        }
    }

    Ok(ExitCode::SUCCESS)
}
