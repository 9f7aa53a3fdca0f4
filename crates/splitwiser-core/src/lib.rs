//! # splitwiser-core: Pure Business Logic for Splitwiser
//!
//! This crate is the **heart** of Splitwiser. It reads a plain-text list of
//! who paid for what, works out everyone's fair share in exact cents and
//! suggests who should pay whom. Zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Splitwiser Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    splitwiser CLI (apps/cli)                    │   │
//! │  │    file / stdin ──► report | validate | format | json | settle  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ splitwiser-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   text ──► validation ──► ledger ──► allocation ──► settlement  │   │
//! │  │              │              │            │              │       │   │
//! │  │           warnings     participants   fair shares    transfers  │   │
//! │  │                        transactions                             │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO GLOBAL STATE • PURE FUNCTIONS                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`number`] - Amount parsing in US and European notation
//! - [`person`] - Participant headers (weight, exclusion)
//! - [`reference`] - Prefix / initial name resolution
//! - [`transaction`] - Line classification and the `Transaction` type
//! - [`validation`] - Duplicate and reference checks
//! - [`ledger`] - `Ledger` and its builder
//! - [`allocation`] - Integer-cent proportional split plus fees
//! - [`settlement`] - Transfer suggestions
//! - [`summary`] - Totals and the text report
//! - [`format`] - Canonical document layout, recording payments
//! - [`money`] - Money type with integer arithmetic
//! - [`config`] - Parse and display options
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use splitwiser_core::{fair_shares, parse, settlements};
//!
//! let ledger = parse("John 2\n100 Dinner\nJane").unwrap();
//!
//! let shares = fair_shares(&ledger).unwrap();
//! assert_eq!(shares["John 2"].to_string(), "66.67");
//! assert_eq!(shares["Jane"].to_string(), "33.33");
//!
//! let transfers = settlements(&ledger);
//! assert_eq!(transfers[0].from, "Jane");
//! assert_eq!(transfers[0].amount.cents(), 3333);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod config;
pub mod error;
pub mod format;
pub mod ledger;
pub mod money;
pub mod number;
pub mod person;
pub mod reference;
pub mod settlement;
pub mod summary;
pub mod transaction;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocation::{FairShareAllocator, FairnessPriority, RemainderPriority};
pub use config::{NumberFormat, ParseOptions, SplitConfig};
pub use error::{CoreError, CoreResult, ValidationError, ValidationWarning};
pub use ledger::{Ledger, LedgerBuilder};
pub use money::Money;
pub use person::Participant;
pub use settlement::{SettlementEngine, Transfer};
pub use transaction::Transaction;

use indexmap::IndexMap;
use tracing::warn;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Balances and overpayments at or below this many cents are treated as
/// settled.
pub const BALANCE_TOLERANCE_CENTS: i64 = 1;

// =============================================================================
// Public API
// =============================================================================

/// Validates a document with default options.
pub fn validate(text: &str) -> Vec<ValidationWarning> {
    validate_with(text, &ParseOptions::default())
}

pub fn validate_with(text: &str, options: &ParseOptions) -> Vec<ValidationWarning> {
    validation::validate_document(text, options)
}

/// Validates, then builds the ledger.
///
/// ## Errors
/// [`CoreError::ValidationFailed`] carrying every warning when the document
/// has duplicate names or unresolvable references.
pub fn parse(text: &str) -> CoreResult<Ledger> {
    parse_with(text, &ParseOptions::default())
}

pub fn parse_with(text: &str, options: &ParseOptions) -> CoreResult<Ledger> {
    let warnings = validate_with(text, options);
    if !warnings.is_empty() {
        return Err(CoreError::ValidationFailed { warnings });
    }
    Ok(LedgerBuilder::new(options).build(text))
}

/// Fair share per participant key, declaration order, fees included.
///
/// ## Errors
/// [`CoreError::AmountOverflow`] when the amounts do not fit in cents.
pub fn fair_shares(ledger: &Ledger) -> CoreResult<IndexMap<String, Money>> {
    Ok(FairShareAllocator::new().allocate(ledger)?.shares)
}

/// Suggested transfers. Never fails; an inconsistent ledger yields none.
pub fn settlements(ledger: &Ledger) -> Vec<Transfer> {
    match SettlementEngine::new(ledger) {
        Ok(engine) => engine.settle(),
        Err(e) => {
            warn!(error = %e, "allocation failed, no suggestions");
            Vec::new()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const REAL_WORLD: &str = "\
John Smith (2)
210.37 Groceries
45,50 Taxi - Jane, Bob
10% Service - Jo, Ja

Jane Doe
1.234,56 Hotel - John, Jane, Bob
20 > John

Bob!
30 Snacks - Bob, Jane
15 > Jane

Carla
";

    #[test]
    fn test_real_world_document() {
        let ledger = parse(REAL_WORLD).unwrap();
        assert_eq!(ledger.participants.len(), 4);
        assert_eq!(ledger.transactions.len(), 7);
        assert_eq!(ledger.expenses().count(), 4);
        assert_eq!(ledger.recorded_settlements().count(), 2);
        assert_eq!(ledger.fees().count(), 1);
    }

    #[test]
    fn test_parse_reports_every_warning() {
        let err = parse("John\nJane\njohn\n50 Dinner - J\n10 > Zed").unwrap_err();
        match err {
            CoreError::ValidationFailed { warnings } => assert_eq!(warnings.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = parse(REAL_WORLD).unwrap();
        let second = parse(REAL_WORLD).unwrap();
        assert_eq!(first, second);
        assert_eq!(fair_shares(&first).unwrap(), fair_shares(&second).unwrap());
        assert_eq!(settlements(&first), settlements(&second));
    }

    #[test]
    fn test_shares_conserve_money() {
        let ledger = parse(REAL_WORLD).unwrap();
        let allocation = FairShareAllocator::new().allocate(&ledger).unwrap();
        let totals = summary::LedgerTotals::compute(&ledger, &allocation).unwrap();
        let shares: Money = fair_shares(&ledger).unwrap().values().sum();
        assert_eq!(shares, totals.base_expenses + totals.applied_fees);
    }

    #[test]
    fn test_four_way_split_round_trip() {
        let ledger = parse("A\n210.36\nB\nC\nD").unwrap();
        let shares = fair_shares(&ledger).unwrap();
        assert!(shares.values().all(|s| s.to_string() == "52.59"));
    }

    #[test]
    fn test_exclusion() {
        let ledger = parse("Restaurant!\n90\nJohn\nJane\nBob").unwrap();
        assert_eq!(fair_shares(&ledger).unwrap()["Restaurant!"], Money::zero());
    }

    #[test]
    fn test_fee_example() {
        let ledger = parse("John\n100 Dinner - John\n15% Tip - John\nJane").unwrap();
        assert_eq!(fair_shares(&ledger).unwrap()["John"].cents(), 11500);
        assert!(settlements(&ledger).is_empty());
    }

    #[test]
    fn test_settlements_never_cross_groups_needlessly() {
        let text = "John\n100 - John, Jane, Bob\nJane\nBob\nAlice\n100 - Alice, Carlos, Luan\nCarlos\nLuan";
        let ledger = parse(text).unwrap();
        let transfers = settlements(&ledger);
        assert_eq!(transfers.len(), 4);
        let first_group = ["John", "Jane", "Bob"];
        for t in &transfers {
            assert_eq!(
                first_group.contains(&t.from.as_str()),
                first_group.contains(&t.to.as_str())
            );
        }
    }

    #[test]
    fn test_huge_amounts_degrade_to_no_settlements() {
        let ledger = parse("A\n90000000000000000\n90000000000000000\nB").unwrap();
        assert!(settlements(&ledger).is_empty());
        assert!(matches!(
            fair_shares(&ledger),
            Err(CoreError::AmountOverflow { .. })
        ));

        let ledger = parse("A\n100\n100000000000000000000%\nB").unwrap();
        assert!(settlements(&ledger).is_empty());
        assert!(fair_shares(&ledger).is_err());
    }

    #[test]
    fn test_one_cent_expense_settles_nothing() {
        let ledger = parse("A\n0.01\nB").unwrap();
        assert!(settlements(&ledger).is_empty());
    }
}
