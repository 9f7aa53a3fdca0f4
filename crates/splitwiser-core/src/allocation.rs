//! # Fair Share Allocation
//!
//! Splits every expense by share weight in integer cents, then applies
//! percentage fees on top.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Group expenses by effective participant set                         │
//! │       "50 Taxi - Jane, Bob" and "20 Gas - Bob, Jane" share a group      │
//! │                                                                         │
//! │  2. Per group, per member:  base = ⌊T·w / W⌋   rem = (T·w) mod W        │
//! │                                                                         │
//! │  3. R = Σ rem   →   extra = R / W   final = R mod W                     │
//! │                                                                         │
//! │  4. Order members by RemainderPriority                                   │
//! │       (default: remainder ↓, paid in group ↑, declaration order ↑)      │
//! │     • final cents: one each from the front                              │
//! │     • extra cents: ⌊extra·w / W⌋ each, leftovers one each from front    │
//! │                                                                         │
//! │  5. Sum groups per participant                                          │
//! │                                                                         │
//! │  6. Fees, in document order: owed += round(owed · pct / 100)            │
//! │     for each affected participant (fees compound)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Example: 210.37 split four ways is 52.59 each with 1 cent left over. The
//! cent goes to the first declared member who paid nothing in the group.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::ledger::Ledger;
use crate::money::Money;
use crate::transaction::Transaction;

// =============================================================================
// Expense Groups
// =============================================================================

/// Expenses that are split among exactly the same participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseGroup {
    /// Sorted participant keys; the identity of the group.
    pub members: Vec<String>,

    /// Sum of the group's expense amounts.
    pub total: Money,

    /// Amount each payer put into this group. Payers need not be members.
    pub paid: IndexMap<String, Money>,
}

impl ExpenseGroup {
    pub fn paid_by(&self, key: &str) -> Money {
        self.paid.get(key).copied().unwrap_or_default()
    }
}

/// Groups the ledger's expenses in order of first appearance.
///
/// Expenses that apply to nobody (every participant excluded) are skipped.
///
/// ## Errors
/// [`CoreError::AmountOverflow`] when a group total leaves the cent range.
pub fn expense_groups(ledger: &Ledger) -> CoreResult<Vec<ExpenseGroup>> {
    let mut groups: IndexMap<Vec<String>, ExpenseGroup> = IndexMap::new();

    for tx in &ledger.transactions {
        let Transaction::Expense {
            amount,
            shared_with,
            paid_by,
            ..
        } = tx
        else {
            continue;
        };

        let mut members: Vec<String> = ledger
            .effective_members(shared_with)
            .into_iter()
            .map(str::to_string)
            .collect();
        if members.is_empty() {
            debug!(amount = %amount, paid_by = %paid_by, "expense with no members skipped");
            continue;
        }
        members.sort();

        let group = groups
            .entry(members.clone())
            .or_insert_with(|| ExpenseGroup {
                members,
                total: Money::zero(),
                paid: IndexMap::new(),
            });
        group.total = checked(group.total, *amount, "expense group total")?;
        let paid = group.paid.entry(paid_by.clone()).or_default();
        *paid = checked(*paid, *amount, "expense group payments")?;
    }

    Ok(groups.into_values().collect())
}

// =============================================================================
// Remainder Priority
// =============================================================================

/// One group member as seen by a [`RemainderPriority`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub key: &'a str,
    pub weight: u32,
    /// `(T·w) mod W` for this member.
    pub remainder: i128,
    pub paid_in_group: Money,
    pub declaration_index: usize,
}

/// Decides who receives leftover cents first.
pub trait RemainderPriority {
    fn compare(&self, a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering;
}

/// Largest remainder first, then whoever paid least in the group, then
/// declaration order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FairnessPriority;

impl RemainderPriority for FairnessPriority {
    fn compare(&self, a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
        b.remainder
            .cmp(&a.remainder)
            .then(a.paid_in_group.cmp(&b.paid_in_group))
            .then(a.declaration_index.cmp(&b.declaration_index))
    }
}

// =============================================================================
// Allocator
// =============================================================================

/// A group together with what each member owes for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupAllocation {
    pub group: ExpenseGroup,
    pub shares: IndexMap<String, Money>,
}

/// What one percentage fee added, attributed to whoever paid it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFee {
    pub paid_by: String,
    pub amount: Money,
}

/// Result of allocating a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    /// Final share per participant, declaration order, fees included.
    pub shares: IndexMap<String, Money>,
    pub groups: Vec<GroupAllocation>,
    /// One entry per fee, document order.
    pub fees: Vec<AppliedFee>,
}

impl Allocation {
    pub fn share_of(&self, key: &str) -> Money {
        self.shares.get(key).copied().unwrap_or_default()
    }

    /// Σ shares; equals Σ allocated expenses + Σ applied fees.
    /// Σ shares. The allocator has already checked that it fits.
    pub fn total(&self) -> Money {
        self.shares.values().sum()
    }
}

/// Proportional allocator with a pluggable remainder rule.
#[derive(Debug, Clone, Default)]
pub struct FairShareAllocator<P = FairnessPriority> {
    priority: P,
}

impl FairShareAllocator<FairnessPriority> {
    pub fn new() -> Self {
        FairShareAllocator {
            priority: FairnessPriority,
        }
    }
}

impl<P: RemainderPriority> FairShareAllocator<P> {
    pub fn with_priority(priority: P) -> Self {
        FairShareAllocator { priority }
    }

    /// Splits every expense group, then applies fees.
    ///
    /// ## Errors
    /// [`CoreError::AmountOverflow`] when any share, fee or the grand total
    /// leaves the cent range.
    pub fn allocate(&self, ledger: &Ledger) -> CoreResult<Allocation> {
        let mut shares: IndexMap<String, Money> = ledger
            .participants
            .keys()
            .map(|k| (k.clone(), Money::zero()))
            .collect();

        let mut groups: Vec<GroupAllocation> = Vec::new();
        for group in expense_groups(ledger)? {
            let group_shares = self.split_group(ledger, &group);
            for (key, share) in &group_shares {
                let owed = shares.entry(key.clone()).or_default();
                *owed = checked(*owed, *share, "fair share")?;
            }
            groups.push(GroupAllocation {
                group,
                shares: group_shares,
            });
        }

        let fees = apply_fees(ledger, &mut shares)?;

        shares
            .values()
            .try_fold(Money::zero(), |total, share| total.checked_add(*share))
            .ok_or_else(|| overflow("total cost"))?;

        Ok(Allocation {
            shares,
            groups,
            fees,
        })
    }

    fn split_group(&self, ledger: &Ledger, group: &ExpenseGroup) -> IndexMap<String, Money> {
        let total = i128::from(group.total.cents());
        let weight_of = |key: &str| -> u32 {
            ledger
                .participant(key)
                .map(|p| p.share_weight.max(1))
                .unwrap_or(1)
        };
        let total_weight: i128 = group
            .members
            .iter()
            .map(|m| i128::from(weight_of(m)))
            .sum();

        let mut base: IndexMap<&str, i128> = IndexMap::new();
        let mut candidates: Vec<Candidate<'_>> = Vec::with_capacity(group.members.len());
        for key in &group.members {
            let weight = weight_of(key);
            let product = total * i128::from(weight);
            base.insert(key.as_str(), product / total_weight);
            candidates.push(Candidate {
                key: key.as_str(),
                weight,
                remainder: product % total_weight,
                paid_in_group: group.paid_by(key),
                declaration_index: ledger.declaration_index(key).unwrap_or(usize::MAX),
            });
        }

        let remainder_sum: i128 = candidates.iter().map(|c| c.remainder).sum();
        let extra = remainder_sum / total_weight;
        let final_cents = remainder_sum % total_weight;

        candidates.sort_by(|a, b| self.priority.compare(a, b));

        for candidate in candidates.iter().take(final_cents as usize) {
            if let Some(cents) = base.get_mut(candidate.key) {
                *cents += 1;
            }
        }

        let mut handed_out = 0i128;
        for candidate in &candidates {
            let portion = extra * i128::from(candidate.weight) / total_weight;
            if let Some(cents) = base.get_mut(candidate.key) {
                *cents += portion;
            }
            handed_out += portion;
        }
        for candidate in candidates.iter().cycle().take((extra - handed_out) as usize) {
            if let Some(cents) = base.get_mut(candidate.key) {
                *cents += 1;
            }
        }

        debug!(
            members = group.members.len(),
            total = %group.total,
            extra = extra as i64,
            "group allocated"
        );

        base.into_iter()
            .map(|(key, cents)| (key.to_string(), Money::from_cents(cents as i64)))
            .collect()
    }
}

/// Adds each fee to the affected participants' running totals.
fn apply_fees(
    ledger: &Ledger,
    shares: &mut IndexMap<String, Money>,
) -> CoreResult<Vec<AppliedFee>> {
    let mut applied = Vec::new();

    for tx in &ledger.transactions {
        let Transaction::PercentageFee {
            percentage,
            shared_with,
            paid_by,
            ..
        } = tx
        else {
            continue;
        };

        let mut added = Money::zero();
        for key in ledger.effective_members(shared_with) {
            if let Some(owed) = shares.get_mut(key) {
                let fee = owed
                    .percentage(*percentage)
                    .ok_or_else(|| overflow("percentage fee"))?;
                *owed = checked(*owed, fee, "percentage fee")?;
                added = checked(added, fee, "percentage fee")?;
            }
        }

        debug!(percentage = *percentage, added = %added, "fee applied");
        applied.push(AppliedFee {
            paid_by: paid_by.clone(),
            amount: added,
        });
    }

    Ok(applied)
}

fn checked(a: Money, b: Money, context: &str) -> CoreResult<Money> {
    a.checked_add(b).ok_or_else(|| overflow(context))
}

fn overflow(context: &str) -> CoreError {
    CoreError::AmountOverflow {
        context: context.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
