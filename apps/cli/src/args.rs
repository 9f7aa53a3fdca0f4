//! Command line parsing.
//!
//! ```text
//! splitwiser [--config PATH] [--write] <COMMAND> [FILE]
//! ```
//! Without `FILE` the document is read from standard input.

use std::path::PathBuf;

use crate::error::{CliError, CliResult};

pub const USAGE: &str = "\
Splitwiser - split shared expenses from a plain-text list

Usage: splitwiser [OPTIONS] <COMMAND> [FILE]

Commands:
  report        Print expenses, fair shares and suggested settlements
  validate      List duplicate names and unresolvable references
  format        Print the document in canonical layout
  json          Print the parsed ledger and results as JSON
  settle <N>    Record the N-th suggested settlement in the document
  help          Show this help message

Options:
  -c, --config <PATH>  Config file (default: platform config dir)
  -w, --write          With settle: write the document back to FILE
  -h, --help           Show this help message

Reads FILE, or standard input when FILE is omitted.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Report,
    Validate,
    Format,
    Json,
    /// 1-based index into the suggested transfers.
    Settle(usize),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub config: Option<PathBuf>,
    pub file: Option<PathBuf>,
    pub write: bool,
}

impl Invocation {
    /// Parses arguments, program name excluded.
    pub fn parse<I, S>(args: I) -> CliResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();

        let mut command = None;
        let mut config = None;
        let mut file = None;
        let mut write = false;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    let path = args
                        .get(i + 1)
                        .ok_or_else(|| usage("--config needs a path"))?;
                    config = Some(PathBuf::from(path));
                    i += 1;
                }
                "--write" | "-w" => write = true,
                "--help" | "-h" | "help" if command.is_none() => command = Some(Command::Help),
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(usage(format!("unknown option {}", flag)));
                }
                word if command.is_none() => {
                    command = Some(match word {
                        "report" => Command::Report,
                        "validate" => Command::Validate,
                        "format" => Command::Format,
                        "json" => Command::Json,
                        "settle" => {
                            let n = args
                                .get(i + 1)
                                .ok_or_else(|| usage("settle needs a settlement number"))?;
                            i += 1;
                            match n.parse::<usize>() {
                                Ok(n) if n > 0 => Command::Settle(n),
                                _ => return Err(usage(format!("invalid settlement number {}", n))),
                            }
                        }
                        other => return Err(usage(format!("unknown command {}", other))),
                    });
                }
                path if file.is_none() => file = Some(PathBuf::from(path)),
                extra => return Err(usage(format!("unexpected argument {}", extra))),
            }
            i += 1;
        }

        let command = command.unwrap_or(Command::Help);
        if write && !matches!(command, Command::Settle(_)) {
            return Err(usage("--write only applies to settle"));
        }
        if write && file.is_none() {
            return Err(usage("--write needs a FILE"));
        }

        Ok(Invocation {
            command,
            config,
            file,
            write,
        })
    }
}

fn usage(message: impl Into<String>) -> CliError {
    CliError::Usage(format!("{}\n\n{}", message.into(), USAGE))
}
