//! Serve command - run the HTTP API

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};

use super::{get_context, get_roster_dir, load_config};
use crate::output;

pub async fn run(data_dir: Option<PathBuf>, bind: Option<String>) -> Result<ExitCode> {
    let roster_dir = get_roster_dir(data_dir)?;
    let mut config = load_config(&roster_dir)?;
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    let ctx = get_context(config).await?;
    for name in &ctx.migrations.applied {
        output::info(&format!("Applied migration {}", name));
    }
    output::info(&format!(
        "Serving POST /api/register on {} (Ctrl-C to stop)",
        ctx.config.server.bind
    ));

    ctx.serve()
        .await
        .with_context(|| format!("Server on {} failed", ctx.config.server.bind))?;

    Ok(ExitCode::SUCCESS)
}
