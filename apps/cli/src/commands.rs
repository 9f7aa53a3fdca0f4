//! Command handlers.
//!
//! Handlers take the document text and return what should be printed;
//! reading and writing files stays in `main`.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use splitwiser_core::summary::{render_summary, LedgerTotals};
use splitwiser_core::{format, Ledger, Money, Participant, SettlementEngine, Transaction, Transfer};

use crate::args::{Command, USAGE};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Result of running one command.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Printed to stdout.
    pub output: String,
    /// Replacement document text, for `settle`.
    pub document: Option<String>,
    /// Non-zero exit without an error message.
    pub failed: bool,
}

impl Outcome {
    fn print(output: impl Into<String>) -> Self {
        Outcome {
            output: output.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    participants: Vec<&'a Participant>,
    transactions: &'a [Transaction],
    fair_shares: &'a IndexMap<String, Money>,
    settlements: &'a [Transfer],
    totals: LedgerTotals,
}

pub fn run(command: Command, text: &str, config: &CliConfig) -> CliResult<Outcome> {
    debug!(?command, bytes = text.len(), "Running command");

    match command {
        Command::Help => Ok(Outcome::print(USAGE)),
        Command::Validate => validate(text, config),
        Command::Report => {
            let ledger = parse(text, config)?;
            let engine = SettlementEngine::new(&ledger)?;
            let transfers = engine.settle();
            Ok(Outcome::print(render_summary(
                &ledger,
                engine.allocation(),
                &transfers,
                &config.parsing,
                &config.format,
            )?))
        }
        Command::Format => {
            let ledger = parse(text, config)?;
            Ok(Outcome::print(format::format_ledger(
                &ledger,
                &config.parsing,
                &config.format,
            )))
        }
        Command::Json => {
            let ledger = parse(text, config)?;
            let engine = SettlementEngine::new(&ledger)?;
            let transfers = engine.settle();
            let report = JsonReport {
                participants: ledger.participants.values().collect(),
                transactions: &ledger.transactions,
                fair_shares: &engine.allocation().shares,
                settlements: &transfers,
                totals: LedgerTotals::compute(&ledger, engine.allocation())?,
            };
            Ok(Outcome::print(serde_json::to_string_pretty(&report)?))
        }
        Command::Settle(index) => settle(text, index, config),
    }
}

fn parse(text: &str, config: &CliConfig) -> CliResult<Ledger> {
    let ledger = splitwiser_core::parse_with(text, &config.parsing)?;
    info!(
        participants = ledger.participants.len(),
        transactions = ledger.transactions.len(),
        "Parsed document"
    );
    Ok(ledger)
}

fn validate(text: &str, config: &CliConfig) -> CliResult<Outcome> {
    let warnings = splitwiser_core::validate_with(text, &config.parsing);
    if warnings.is_empty() {
        return Ok(Outcome::print("OK"));
    }

    let output = warnings
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Outcome {
        output,
        document: None,
        failed: true,
    })
}

fn settle(text: &str, index: usize, config: &CliConfig) -> CliResult<Outcome> {
    let ledger = parse(text, config)?;
    let transfers = SettlementEngine::new(&ledger)?.settle();
    let transfer = index
        .checked_sub(1)
        .and_then(|i| transfers.get(i))
        .ok_or(CliError::NoSuchSettlement {
            index,
            available: transfers.len(),
        })?;

    info!(
        from = %transfer.from,
        to = %transfer.to,
        amount = %transfer.amount,
        "Recording settlement"
    );
    let updated = format::record_transfer(text, transfer, &config.split_config())?;

    Ok(Outcome {
        output: updated.clone(),
        document: Some(updated),
        failed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitwiser_core::CoreError;

    const TRIP: &str = "John (2)\n100 Groceries\nJane\n";

    fn run_default(command: Command, text: &str) -> CliResult<Outcome> {
        run(command, text, &CliConfig::default())
    }

    #[test]
    fn test_report() {
        let out = run_default(Command::Report, TRIP).unwrap();
        assert!(out.output.contains("*COSTS* = 100.00"));
        assert!(out.output.contains("Jane owes 33.33 to John"));
        assert!(!out.failed);
    }

    #[test]
    fn test_validate_ok_and_failing() {
        assert_eq!(run_default(Command::Validate, TRIP).unwrap().output, "OK");

        let out = run_default(Command::Validate, "John\njohn\n10 - Zed").unwrap();
        assert!(out.failed);
        assert_eq!(out.output.lines().count(), 2);
    }

    #[test]
    fn test_report_on_invalid_document_errors() {
        assert!(matches!(
            run_default(Command::Report, "John\nJOHN"),
            Err(CliError::Core(CoreError::ValidationFailed { .. }))
        ));
    }

    #[test]
    fn test_json_output() {
        let out = run_default(Command::Json, TRIP).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out.output).unwrap();
        assert_eq!(value["participants"].as_array().unwrap().len(), 2);
        assert_eq!(value["settlements"][0]["from"], "Jane");
        assert!(value["fair_shares"].get("John (2)").is_some());
    }

    #[test]
    fn test_format_uses_configured_separators() {
        let mut config = CliConfig::default();
        config.format = splitwiser_core::NumberFormat::european();
        let out = run(Command::Format, "Ann\n1234.5 Rent\nBen", &config).unwrap();
        assert!(out.output.contains("1.234,50 Rent"));
    }

    #[test]
    fn test_settle_records_transfer() {
        let out = run_default(Command::Settle(1), TRIP).unwrap();
        assert_eq!(
            out.document.as_deref(),
            Some("John (2)\n100 Groceries\nJane\n33.33 > John\n")
        );

        let settled = run_default(Command::Report, &out.output).unwrap();
        assert!(settled.output.contains("*ALL SETTLED!*"));
    }

    #[test]
    fn test_settle_out_of_range() {
        assert!(matches!(
            run_default(Command::Settle(2), TRIP),
            Err(CliError::NoSuchSettlement {
                index: 2,
                available: 1
            })
        ));
    }

    #[test]
    fn test_report_on_overflowing_amounts_errors() {
        assert!(matches!(
            run_default(Command::Report, "A\n90000000000000000\n90000000000000000\nB"),
            Err(CliError::Core(CoreError::AmountOverflow { .. }))
        ));
    }
}
