//! # Summary
//!
//! Totals over a ledger and the plain-text report that can be pasted into a
//! chat:
//!
//! ```text
//! *EXPENSES*
//! John (2)
//!  100.00 Groceries
//!
//! *COSTS* = 100.00
//! John (2) = 66.67
//! Jane = 33.33
//!
//! *SETTLEMENTS*
//! Jane owes 33.33 to John
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::allocation::Allocation;
use crate::config::{NumberFormat, ParseOptions};
use crate::error::{CoreError, CoreResult};
use crate::format::{amount_line, describe};
use crate::ledger::Ledger;
use crate::money::Money;
use crate::settlement::Transfer;
use crate::transaction::Transaction;

/// Ledger-wide totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerTotals {
    /// Σ expense amounts.
    pub base_expenses: Money,
    /// Σ cents added by percentage fees.
    pub applied_fees: Money,
    /// Σ fair shares.
    pub total_cost: Money,
    /// Σ settlements already recorded in the document.
    pub recorded_settlements: Money,
}

impl LedgerTotals {
    /// ## Errors
    /// [`CoreError::AmountOverflow`] when a total leaves the cent range.
    pub fn compute(ledger: &Ledger, allocation: &Allocation) -> CoreResult<Self> {
        let base_expenses = checked_sum(
            ledger.expenses().filter_map(|t| match t {
                Transaction::Expense { amount, .. } => Some(*amount),
                _ => None,
            }),
            "expense total",
        )?;
        let recorded_settlements = checked_sum(
            ledger.recorded_settlements().filter_map(|t| match t {
                Transaction::Settlement { amount, .. } => Some(*amount),
                _ => None,
            }),
            "settlement total",
        )?;

        Ok(LedgerTotals {
            base_expenses,
            applied_fees: checked_sum(allocation.fees.iter().map(|f| f.amount), "fee total")?,
            total_cost: checked_sum(allocation.shares.values().copied(), "total cost")?,
            recorded_settlements,
        })
    }
}

fn checked_sum(mut amounts: impl Iterator<Item = Money>, context: &str) -> CoreResult<Money> {
    amounts
        .try_fold(Money::zero(), Money::checked_add)
        .ok_or_else(|| CoreError::AmountOverflow {
            context: context.to_string(),
        })
}

/// Renders the three-block text report.
pub fn render_summary(
    ledger: &Ledger,
    allocation: &Allocation,
    transfers: &[Transfer],
    parsing: &ParseOptions,
    format: &NumberFormat,
) -> CoreResult<String> {
    let totals = LedgerTotals::compute(ledger, allocation)?;
    let mut out = String::new();

    let payments = payments_text(ledger, format);
    if !payments.is_empty() {
        out.push_str("*EXPENSES*\n");
        out.push_str(&payments);
        out.push('\n');
    }

    // Costs
    if totals.total_cost.is_zero() {
        out.push_str("\n*COSTS*\n");
    } else {
        out.push_str(&format!("\n*COSTS* = {}\n", totals.total_cost.format(format)));
    }
    for participant in ledger.participants.values().filter(|p| !p.is_excluded) {
        out.push_str(&format!(
            "{} = {}\n",
            participant.label(),
            allocation.share_of(&participant.key).format(format)
        ));
    }

    // Settlements
    let name = |key: &str| -> String {
        ledger
            .participant(key)
            .map(|p| p.settlement_name(parsing).to_string())
            .unwrap_or_else(|| key.to_string())
    };

    if !totals.total_cost.is_zero() && transfers.is_empty() {
        out.push_str("\n*ALL SETTLED!*\n");
    } else {
        out.push_str("\n*SETTLEMENTS*\n");
    }
    if totals.total_cost.is_zero() {
        out.push_str("Nothing to settle!\n");
    } else {
        for transfer in transfers {
            out.push_str(&format!(
                "{} owes {} to {}\n",
                name(&transfer.from),
                transfer.amount.format(format),
                name(&transfer.to)
            ));
        }
    }
    for tx in ledger.recorded_settlements() {
        if let Transaction::Settlement {
            amount,
            paid_by,
            settle_to,
        } = tx
        {
            out.push_str(&format!(
                "{} paid {} to {}\n",
                name(paid_by),
                amount.format(format),
                name(settle_to)
            ));
        }
    }

    Ok(out)
}

/// Expense lines only, grouped under their payers.
fn payments_text(ledger: &Ledger, format: &NumberFormat) -> String {
    let width = ledger
        .expenses()
        .filter_map(|t| match t {
            Transaction::Expense { amount, .. } => Some(amount.format(format).chars().count()),
            _ => None,
        })
        .max()
        .unwrap_or(8);

    let mut out = String::new();
    for participant in ledger.participants.values() {
        let lines: Vec<String> = ledger
            .expenses()
            .filter(|t| t.paid_by() == participant.key)
            .filter_map(|t| match t {
                Transaction::Expense {
                    amount,
                    description,
                    shared_with,
                    ..
                } => Some(amount_line(
                    &amount.format(format),
                    &describe(ledger, description, shared_with),
                    width,
                )),
                _ => None,
            })
            .collect();
        if lines.is_empty() {
            continue;
        }

        out.push_str(&participant.label());
        out.push('\n');
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::FairShareAllocator;
    use crate::ledger::LedgerBuilder;
    use crate::settlement::SettlementEngine;

    fn report(text: &str) -> String {
        let options = ParseOptions::default();
        let ledger = LedgerBuilder::new(&options).build(text);
        let engine = SettlementEngine::new(&ledger).unwrap();
        render_summary(
            &ledger,
            engine.allocation(),
            &engine.settle(),
            &options,
            &NumberFormat::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_totals() {
        let ledger = LedgerBuilder::new(&ParseOptions::default())
            .build("John\n100\n10% Tip\n20 > Jane\nJane");
        let allocation = FairShareAllocator::new().allocate(&ledger).unwrap();
        let totals = LedgerTotals::compute(&ledger, &allocation).unwrap();

        assert_eq!(totals.base_expenses.cents(), 10000);
        assert_eq!(totals.applied_fees.cents(), 1000);
        assert_eq!(totals.total_cost.cents(), 11000);
        assert_eq!(totals.recorded_settlements.cents(), 2000);
    }

    #[test]
    fn test_full_report() {
        let text = report("John (2)\n100 Groceries\nJane\nRestaurant!");
        let expected = "\
*EXPENSES*
John (2)
100.00 Groceries

*COSTS* = 100.00
John (2) = 66.67
Jane = 33.33

*SETTLEMENTS*
Jane owes 33.33 to John
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_all_settled() {
        let text = report("John\n100\nJane\n50 > John");
        assert!(text.contains("*ALL SETTLED!*"));
        assert!(text.ends_with("Jane paid 50.00 to John\n"));
    }

    #[test]
    fn test_nothing_to_settle() {
        let text = report("John\nJane");
        assert!(!text.contains("*EXPENSES*"));
        assert!(text.starts_with("\n*COSTS*\n"));
        assert!(text.contains("*SETTLEMENTS*\nNothing to settle!\n"));
    }

    #[test]
    fn test_excluded_names_drop_marker_in_settlements() {
        let text = report("Restaurant!\n90 - John\nJohn");
        assert!(text.contains("John owes 90.00 to Restaurant\n"));
        assert!(!text.contains("Restaurant! ="));
    }

    #[test]
    fn test_recorded_settlement_total_overflow() {
        let ledger = LedgerBuilder::new(&ParseOptions::default())
            .build("John\n90000000000000000 > Jane\n90000000000000000 > Jane\nJane");
        let allocation = FairShareAllocator::new().allocate(&ledger).unwrap();
        assert!(matches!(
            LedgerTotals::compute(&ledger, &allocation),
            Err(CoreError::AmountOverflow { context }) if context == "settlement total"
        ));
    }
}
