//! # Ledger
//!
//! The parsed form of one input document: who takes part and, in order,
//! every expense, fee and recorded settlement.
//!
//! ## Building
//! ```text
//! text ──► collect headers ──► fold over lines ──► Ledger
//!                                │
//!                                └─ accumulator: Option<current payer>
//! ```
//!
//! The builder never fails. Lines it cannot use are skipped and logged at
//! debug level. Validation is a separate step (see [`crate::parse`]).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::config::ParseOptions;
use crate::money::Money;
use crate::number::parse_amount;
use crate::person::Participant;
use crate::reference::{resolve, Resolution};
use crate::transaction::{classify_line, split_shared, LineShape, SharedBody, Transaction};
use crate::validation::collect_participants;

// =============================================================================
// Ledger
// =============================================================================

/// Participants in declaration order plus transactions in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Ledger {
    #[ts(type = "Record<string, Participant>")]
    pub participants: IndexMap<String, Participant>,
    pub transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn participant(&self, key: &str) -> Option<&Participant> {
        self.participants.get(key)
    }

    /// Position of the participant's header among all headers.
    pub fn declaration_index(&self, key: &str) -> Option<usize> {
        self.participants.get_index_of(key)
    }

    /// Participants an expense or fee applies to.
    ///
    /// An empty list means every non-excluded participant; otherwise the
    /// listed keys that exist, in the listed order.
    pub fn effective_members<'a>(&'a self, shared_with: &'a [String]) -> Vec<&'a str> {
        if shared_with.is_empty() {
            self.participants
                .values()
                .filter(|p| !p.is_excluded)
                .map(|p| p.key.as_str())
                .collect()
        } else {
            shared_with
                .iter()
                .map(String::as_str)
                .filter(|key| self.participants.contains_key(*key))
                .collect()
        }
    }

    pub fn expenses(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(|t| t.is_expense())
    }

    pub fn fees(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(|t| t.is_fee())
    }

    pub fn recorded_settlements(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(|t| t.is_settlement())
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Turns input text into a [`Ledger`] without validating it.
pub struct LedgerBuilder<'o> {
    options: &'o ParseOptions,
}

impl<'o> LedgerBuilder<'o> {
    pub fn new(options: &'o ParseOptions) -> Self {
        LedgerBuilder { options }
    }

    pub fn build(&self, text: &str) -> Ledger {
        let participants: IndexMap<String, Participant> =
            collect_participants(text, self.options, None)
                .into_iter()
                .map(|p| (p.key.clone(), p))
                .collect();

        let mut transactions = Vec::new();
        let mut payer: Option<String> = None;

        for line in text.lines().map(str::trim) {
            match classify_line(line) {
                LineShape::Blank => {
                    if self.options.reset_payer_on_blank_line {
                        payer = None;
                    }
                }
                LineShape::Header => {
                    // Skipped duplicates leave lines below them without a payer.
                    payer = participants
                        .contains_key(line)
                        .then(|| line.to_string());
                }
                LineShape::Unrecognized => {
                    debug!(line, "unrecognized line skipped");
                }
                shape => match payer.as_deref() {
                    Some(paid_by) => {
                        match Self::transaction(shape, paid_by, &participants) {
                            Some(tx) => transactions.push(tx),
                            None => debug!(line, "amount line discarded"),
                        }
                    }
                    None => debug!(line, "amount line without a payer skipped"),
                },
            }
        }

        debug!(
            participants = participants.len(),
            transactions = transactions.len(),
            "ledger built"
        );

        Ledger {
            participants,
            transactions,
        }
    }

    fn transaction(
        shape: LineShape<'_>,
        paid_by: &str,
        participants: &IndexMap<String, Participant>,
    ) -> Option<Transaction> {
        match shape {
            LineShape::Fee { percentage, body } => {
                let percentage = parse_amount(percentage).filter(|p| *p > 0.0)?;
                Some(Transaction::PercentageFee {
                    percentage,
                    description: body.description.to_string(),
                    shared_with: resolve_all(&body, participants),
                    paid_by: paid_by.to_string(),
                })
            }
            LineShape::Settlement {
                amount,
                target,
                rest,
            } => match resolve(target, participants.values()) {
                Some(Resolution::Unique(recipient)) => Some(Transaction::Settlement {
                    amount: positive_cents(amount)?,
                    paid_by: paid_by.to_string(),
                    settle_to: recipient.key.clone(),
                }),
                _ => Self::expense(amount, &split_shared(rest), paid_by, participants),
            },
            LineShape::Expense { amount, body } => {
                Self::expense(amount, &body, paid_by, participants)
            }
            LineShape::Blank | LineShape::Header | LineShape::Unrecognized => None,
        }
    }

    fn expense(
        amount: &str,
        body: &SharedBody<'_>,
        paid_by: &str,
        participants: &IndexMap<String, Participant>,
    ) -> Option<Transaction> {
        Some(Transaction::Expense {
            amount: positive_cents(amount)?,
            description: body.description.to_string(),
            shared_with: resolve_all(body, participants),
            paid_by: paid_by.to_string(),
        })
    }
}

fn positive_cents(amount: &str) -> Option<Money> {
    parse_amount(amount)
        .and_then(Money::from_decimal)
        .filter(Money::is_positive)
}

/// Unique resolutions only, deduplicated, in written order.
fn resolve_all(body: &SharedBody<'_>, participants: &IndexMap<String, Participant>) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for reference in &body.references {
        match resolve(reference, participants.values()) {
            Some(Resolution::Unique(p)) => {
                if !keys.contains(&p.key) {
                    keys.push(p.key.clone());
                }
            }
            _ => debug!(reference = *reference, "unresolved reference dropped"),
        }
    }
    keys
}

// =============================================================================
// Unit Tests
// =============================================================================
