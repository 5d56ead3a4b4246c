//! Roster CLI - user registration service

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{migrate, register, serve};

/// Roster - user registration service
#[derive(Parser)]
#[command(name = "roster", version, about, long_about = None)]
struct Cli {
    /// Directory holding settings.json and the database (default ~/.roster)
    #[arg(long, global = true, env = "ROSTER_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP registration API
    Serve {
        /// Address to listen on, overriding the configured one
        #[arg(long)]
        bind: Option<String>,
    },

    /// Register one account from the command line
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "ROSTER_PASSWORD", hide_env_values = true)]
        password: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply pending database migrations
    Migrate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.command);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
/// `RUST_LOG` overrides the per-command default level.
fn init_tracing(command: &Commands) {
    let default_level = match command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let data_dir = cli.data_dir;
    match cli.command {
        Commands::Serve { bind } => serve::run(data_dir, bind).await,
        Commands::Register { first_name, last_name, email, password, json } => {
            register::run(data_dir, first_name, last_name, email, password, json).await
        }
        Commands::Migrate { json } => migrate::run(data_dir, json).await,
    }
}
