//! # Splitwiser CLI
//!
//! Reads an expense document and prints fair shares and settlements.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            splitwiser                                   │
//! │                                                                         │
//! │  args ──► config (toml + env) ──► read FILE / stdin                     │
//! │                                         │                               │
//! │                                         ▼                               │
//! │                               commands::run(...)                        │
//! │                                         │                               │
//! │                     stdout ◄────────────┴────────► FILE (settle -w)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod args;
mod commands;
mod config;
mod error;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::args::{Command, Invocation};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

fn main() -> anyhow::Result<()> {
    let invocation = match Invocation::parse(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(CliError::Usage(message)) => {
            eprintln!("{}", message);
            process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    let config = load_config(invocation.config.clone())?;
    init_tracing(&config);
    debug!(?invocation, "Starting splitwiser");

    if invocation.command == Command::Help {
        println!("{}", args::USAGE);
        return Ok(());
    }

    let text = read_document(invocation.file.as_deref())?;
    let outcome = commands::run(invocation.command, &text, &config)?;

    match (&outcome.document, &invocation.file) {
        (Some(document), Some(path)) if invocation.write => {
            std::fs::write(path, document).map_err(|source| CliError::WriteOutput {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "Document updated");
        }
        _ => print!("{}", with_newline(&outcome.output)),
    }

    if outcome.failed {
        process::exit(1);
    }
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> CliResult<CliConfig> {
    Ok(CliConfig::load(path)?)
}

/// Logs go to stderr. `RUST_LOG` wins over the configured level.
fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_document(file: Option<&Path>) -> CliResult<String> {
    match file {
        Some(path) if path != Path::new("-") => {
            debug!(path = %path.display(), "Reading document");
            std::fs::read_to_string(path).map_err(|source| CliError::ReadInput {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(CliError::Stdin)?;
            Ok(buffer)
        }
    }
}

fn with_newline(output: &str) -> String {
    if output.is_empty() || output.ends_with('\n') {
        output.to_string()
    } else {
        format!("{}\n", output)
    }
}
