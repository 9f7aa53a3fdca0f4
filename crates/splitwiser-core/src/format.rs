//! # Document Formatting
//!
//! Writes a ledger back out as input text, and records a settlement by
//! editing the source document.
//!
//! Canonical layout:
//! ```text
//! John (2)
//!  100.00 Groceries
//!   50.50 Taxi - Jane, Bob!
//!     10% Service
//!   25.00 > Jane
//!
//! Jane
//! ```
//! Amounts are right-aligned to the widest amount in the document.

use crate::config::{NumberFormat, ParseOptions, SplitConfig};
use crate::error::{CoreError, CoreResult};
use crate::ledger::Ledger;
use crate::number::AMOUNT_PREFIX;
use crate::settlement::Transfer;
use crate::transaction::Transaction;

/// Re-emits a ledger as canonical input text.
pub fn format_ledger(ledger: &Ledger, parsing: &ParseOptions, format: &NumberFormat) -> String {
    let width = ledger
        .transactions
        .iter()
        .map(|t| amount_text(t, format).chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for participant in ledger.participants.values() {
        out.push_str(&participant.label());
        out.push('\n');

        let mut wrote_any = false;
        for tx in ledger
            .transactions
            .iter()
            .filter(|t| t.paid_by() == participant.key)
        {
            let description = match tx {
                Transaction::Expense {
                    description,
                    shared_with,
                    ..
                }
                | Transaction::PercentageFee {
                    description,
                    shared_with,
                    ..
                } => describe(ledger, description, shared_with),
                Transaction::Settlement { settle_to, .. } => {
                    let name = ledger
                        .participant(settle_to)
                        .map(|p| p.settlement_name(parsing))
                        .unwrap_or(settle_to.as_str());
                    format!("> {}", name)
                }
            };
            out.push_str(&amount_line(&amount_text(tx, format), &description, width));
            out.push('\n');
            wrote_any = true;
        }

        if wrote_any {
            out.push('\n');
        }
    }

    out.trim().to_string()
}

/// Inserts `<amount> > <recipient>` into the payer's section of `text`.
///
/// The line goes before the first blank line or next header below the
/// payer's header, or at the end. The result is parsed again and only
/// returned if it records exactly the requested payment.
pub fn record_transfer(
    text: &str,
    transfer: &Transfer,
    config: &SplitConfig,
) -> CoreResult<String> {
    if !transfer.amount.is_positive() {
        return Err(CoreError::InvalidAmount {
            reason: format!("{} is not a positive amount", transfer.amount),
        });
    }

    let ledger = crate::parse_with(text, &config.parsing)?;
    if ledger.participant(&transfer.from).is_none() {
        return Err(CoreError::ParticipantNotFound(transfer.from.clone()));
    }
    let recipient = ledger
        .participant(&transfer.to)
        .ok_or_else(|| CoreError::ParticipantNotFound(transfer.to.clone()))?;

    let new_line = format!(
        "{} > {}",
        transfer.amount.format(&config.format),
        recipient.settlement_name(&config.parsing)
    );

    let mut lines: Vec<&str> = text.lines().collect();
    let payer_at = lines
        .iter()
        .position(|l| l.trim() == transfer.from)
        .ok_or_else(|| CoreError::ParticipantNotFound(transfer.from.clone()))?;

    let mut insert_at = lines.len();
    let mut blank_seen = false;
    for (i, line) in lines.iter().enumerate().skip(payer_at + 1) {
        let line = line.trim();
        if line.is_empty() {
            if !blank_seen {
                insert_at = i;
                blank_seen = true;
            }
            continue;
        }
        if !AMOUNT_PREFIX.is_match(line) {
            if !blank_seen {
                insert_at = i;
            }
            break;
        }
    }
    lines.insert(insert_at, &new_line);

    let mut updated = lines.join("\n");
    if text.ends_with('\n') {
        updated.push('\n');
    }

    let reparsed = crate::parse_with(&updated, &config.parsing)?;
    let recorded = |l: &Ledger| {
        l.recorded_settlements()
            .filter(|t| match t {
                Transaction::Settlement {
                    amount,
                    paid_by,
                    settle_to,
                } => {
                    *amount == transfer.amount
                        && *paid_by == transfer.from
                        && *settle_to == transfer.to
                }
                _ => false,
            })
            .count()
    };
    if recorded(&reparsed) != recorded(&ledger) + 1 {
        return Err(CoreError::UnrecordableTransfer {
            from: transfer.from.clone(),
            to: transfer.to.clone(),
            amount: transfer.amount.to_string(),
        });
    }

    Ok(updated)
}

/// `description - Name, Name` for explicit lists, the bare description
/// otherwise.
pub(crate) fn describe(ledger: &Ledger, description: &str, shared_with: &[String]) -> String {
    if shared_with.is_empty() {
        return description.to_string();
    }
    let names = shared_with
        .iter()
        .map(|key| {
            ledger
                .participant(key)
                .map(|p| p.display_name.as_str())
                .unwrap_or(key.as_str())
        })
        .collect::<Vec<_>>()
        .join(", ");

    if description.is_empty() {
        format!("- {}", names)
    } else {
        format!("{} - {}", description, names)
    }
}

/// Right-aligns `amount` to `width` and appends the description.
pub(crate) fn amount_line(amount: &str, description: &str, width: usize) -> String {
    if description.is_empty() {
        format!("{:>width$}", amount, width = width)
    } else {
        format!("{:>width$} {}", amount, description, width = width)
    }
}

fn amount_text(tx: &Transaction, format: &NumberFormat) -> String {
    match tx {
        Transaction::PercentageFee { percentage, .. } => format!("{}%", percentage),
        Transaction::Expense { amount, .. } | Transaction::Settlement { amount, .. } => {
            amount.format(format)
        }
    }
}
