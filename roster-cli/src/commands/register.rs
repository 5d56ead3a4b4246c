//! Register command - run the registration pipeline once

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use roster_core::{AccountRecord, OutcomeKind, RegistrationInput};

use super::{get_context, get_roster_dir, load_config};
use crate::output;

#[derive(Serialize)]
struct RegisterOutput<'a> {
    ok: bool,
    message: String,
    outcome: OutcomeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    account: Option<&'a AccountRecord>,
}

pub async fn run(
    data_dir: Option<PathBuf>,
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    json: bool,
) -> Result<ExitCode> {
    let roster_dir = get_roster_dir(data_dir)?;
    let config = load_config(&roster_dir)?;
    let ctx = get_context(config).await?;

    let outcome = ctx
        .register(RegistrationInput::new(first_name, last_name, email, password))
        .await;
    let code = if outcome.is_registered() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    };

    if json {
        let out = RegisterOutput {
            ok: outcome.is_registered(),
            message: outcome.message(),
            outcome: outcome.kind(),
            account: outcome.account(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(code);
    }

    match outcome.account() {
        Some(account) => {
            output::success("Registered");
            println!("  {} {}", "id:".dimmed(), account.id);
            println!("  {} {} {}", "name:".dimmed(), account.first_name, account.last_name);
            println!("  {} {}", "email:".dimmed(), account.email);
            println!("  {} {}", "created:".dimmed(), account.created_at.to_rfc3339());
        }
        None if outcome.kind() == OutcomeKind::Conflict => output::warning(&outcome.message()),
        None => output::error(&outcome.message()),
    }

    Ok(code)
}
