//! # Transactions and Line Classification
//!
//! Every non-blank line is one of four shapes. The first pattern that
//! matches wins:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Shape        Pattern                          Example                  │
//! │  ───────────  ───────────────────────────────  ───────────────────────  │
//! │  Fee          <number>%<rest>                  10% Service - Jo, Bo     │
//! │  Settlement   <amount> > <ref>                 25 > Alice               │
//! │  Expense      <amount><rest>                   50 Dinner - Jane         │
//! │  Header       starts with a letter             Bob (3)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `<rest>` splits on its last standalone dash into a description and a
//! comma separated reference list. A settlement whose target does not
//! resolve is read as an expense instead; that decision needs the
//! participant list, so it is made by the ledger builder, not here.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::number::AMOUNT_PATTERN;
use crate::person::is_header;

static FEE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:[.,]\d+)?)\s*%\s*(.*)$").expect("fee pattern is valid")
});

static SETTLEMENT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^({})\s*>\s*(.+)$", AMOUNT_PATTERN))
        .expect("settlement pattern is valid")
});

static EXPENSE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^({})(.*)$", AMOUNT_PATTERN)).expect("expense pattern is valid")
});

// =============================================================================
// Transaction
// =============================================================================

/// One parsed amount line, attributed to the payer above it.
///
/// An empty `shared_with` means every non-excluded participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum Transaction {
    Expense {
        amount: Money,
        description: String,
        shared_with: Vec<String>,
        paid_by: String,
    },
    PercentageFee {
        percentage: f64,
        description: String,
        shared_with: Vec<String>,
        paid_by: String,
    },
    Settlement {
        amount: Money,
        paid_by: String,
        settle_to: String,
    },
}

impl Transaction {
    pub fn paid_by(&self) -> &str {
        match self {
            Transaction::Expense { paid_by, .. }
            | Transaction::PercentageFee { paid_by, .. }
            | Transaction::Settlement { paid_by, .. } => paid_by,
        }
    }

    /// Explicit participant list, `None` for settlements.
    pub fn shared_with(&self) -> Option<&[String]> {
        match self {
            Transaction::Expense { shared_with, .. }
            | Transaction::PercentageFee { shared_with, .. } => Some(shared_with),
            Transaction::Settlement { .. } => None,
        }
    }

    pub fn is_expense(&self) -> bool {
        matches!(self, Transaction::Expense { .. })
    }

    pub fn is_fee(&self) -> bool {
        matches!(self, Transaction::PercentageFee { .. })
    }

    pub fn is_settlement(&self) -> bool {
        matches!(self, Transaction::Settlement { .. })
    }
}

// =============================================================================
// Line Classification
// =============================================================================

/// Description and raw references of an expense or fee line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedBody<'a> {
    pub description: &'a str,
    /// Trimmed, non-empty references in written order.
    pub references: Vec<&'a str>,
}

/// The syntactic shape of one trimmed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineShape<'a> {
    Blank,
    Header,
    Fee {
        percentage: &'a str,
        body: SharedBody<'a>,
    },
    /// `rest` is everything after the amount, for the expense fallback.
    Settlement {
        amount: &'a str,
        target: &'a str,
        rest: &'a str,
    },
    Expense {
        amount: &'a str,
        body: SharedBody<'a>,
    },
    Unrecognized,
}

/// Classifies a single line without looking at other lines.
///
/// ## Example
/// ```rust
/// use splitwiser_core::transaction::{classify_line, LineShape};
///
/// match classify_line("50 Dinner - Jane, Bob") {
///     LineShape::Expense { amount, body } => {
///         assert_eq!(amount, "50");
///         assert_eq!(body.description, "Dinner");
///         assert_eq!(body.references, vec!["Jane", "Bob"]);
///     }
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub fn classify_line(line: &str) -> LineShape<'_> {
    let line = line.trim();
    if line.is_empty() {
        return LineShape::Blank;
    }

    if let Some(caps) = FEE_LINE.captures(line) {
        if let (Some(pct), Some(rest)) = (caps.get(1), caps.get(2)) {
            return LineShape::Fee {
                percentage: pct.as_str(),
                body: split_shared(rest.as_str()),
            };
        }
    }

    if let Some(caps) = SETTLEMENT_LINE.captures(line) {
        if let (Some(amount), Some(target)) = (caps.get(1), caps.get(2)) {
            return LineShape::Settlement {
                amount: amount.as_str(),
                target: target.as_str().trim(),
                rest: &line[amount.end()..],
            };
        }
    }

    if let Some(caps) = EXPENSE_LINE.captures(line) {
        if let (Some(amount), Some(rest)) = (caps.get(1), caps.get(2)) {
            return LineShape::Expense {
                amount: amount.as_str(),
                body: split_shared(rest.as_str()),
            };
        }
    }

    if is_header(line) {
        LineShape::Header
    } else {
        LineShape::Unrecognized
    }
}

/// Splits `<description> - <ref>, <ref>` on the last dash that has
/// whitespace (or the string edge) on both sides.
pub fn split_shared(rest: &str) -> SharedBody<'_> {
    let bytes = rest.as_bytes();
    let separator = rest.rmatch_indices('-').map(|(i, _)| i).find(|&i| {
        let before = i == 0 || bytes[i - 1].is_ascii_whitespace();
        let after = i + 1 == bytes.len() || bytes[i + 1].is_ascii_whitespace();
        before && after
    });

    match separator {
        Some(i) => SharedBody {
            description: rest[..i].trim(),
            references: rest[i + 1..]
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .collect(),
        },
        None => SharedBody {
            description: rest.trim(),
            references: Vec::new(),
        },
    }
}
