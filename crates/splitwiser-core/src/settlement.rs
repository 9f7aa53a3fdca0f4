//! # Settlement Engine
//!
//! Turns balances into a short list of "A pays B" transfers.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  balances       paid (expenses + fees actually applied) − fair share    │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  per group      paid in group − owed in group, greedy match             │
//! │      │          (people who only share a dinner settle that dinner)     │
//! │      ▼                                                                  │
//! │  cross group    whatever is left (mostly fees), greedy match            │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  reconcile      subtract payments already recorded in the document;     │
//! │                 an overpayment becomes a transfer back                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Greedy matching sorts debtors and creditors by amount, largest first,
//! ties broken by declaration order, and pairs them off.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use ts_rs::TS;

use crate::allocation::{Allocation, FairShareAllocator};
use crate::error::CoreResult;
use crate::ledger::Ledger;
use crate::money::Money;
use crate::transaction::Transaction;
use crate::BALANCE_TOLERANCE_CENTS;

/// A suggested payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transfer {
    /// Participant key of the payer.
    pub from: String,
    /// Participant key of the recipient.
    pub to: String,
    pub amount: Money,
}

impl Transfer {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: Money) -> Self {
        Transfer {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }
}

/// Internal failures. Callers of [`SettlementEngine::settle`] never see
/// these; they are logged and the result degrades to no suggestions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettlementError {
    #[error("Unknown participant in ledger: {0}")]
    UnknownParticipant(String),

    #[error("Balance overflow for {0}")]
    Overflow(String),
}

type Flows = IndexMap<(String, String), i64>;

// =============================================================================
// Engine
// =============================================================================

pub struct SettlementEngine<'l> {
    ledger: &'l Ledger,
    allocation: Allocation,
}

impl<'l> SettlementEngine<'l> {
    /// Uses the default allocator.
    ///
    /// ## Errors
    /// [`crate::CoreError::AmountOverflow`] when the ledger's amounts cannot be
    /// allocated in the cent range.
    pub fn new(ledger: &'l Ledger) -> CoreResult<Self> {
        let allocation = FairShareAllocator::new().allocate(ledger)?;
        Ok(Self::with_allocation(ledger, allocation))
    }

    pub fn with_allocation(ledger: &'l Ledger, allocation: Allocation) -> Self {
        SettlementEngine { ledger, allocation }
    }

    pub fn allocation(&self) -> &Allocation {
        &self.allocation
    }

    /// Suggested transfers, or an empty list if the ledger is inconsistent.
    pub fn settle(&self) -> Vec<Transfer> {
        match self.try_settle() {
            Ok(transfers) => transfers,
            Err(e) => {
                warn!(error = %e, "settlement computation failed, no suggestions");
                Vec::new()
            }
        }
    }

    pub fn try_settle(&self) -> Result<Vec<Transfer>, SettlementError> {
        let balances = self.balances()?;
        let mut remaining: IndexMap<String, i64> = balances
            .iter()
            .map(|(k, v)| (k.clone(), v.cents()))
            .collect();

        let mut suggested: Vec<Transfer> = Vec::new();

        for group in &self.allocation.groups {
            let mut group_balances: IndexMap<String, i64> = IndexMap::new();
            for key in group.group.members.iter().chain(group.group.paid.keys()) {
                let owed = group.shares.get(key).copied().unwrap_or_default();
                let net = group.group.paid_by(key).cents() - owed.cents();
                group_balances.insert(key.clone(), net);
            }

            for transfer in self.greedy(&group_balances) {
                self.apply(&mut remaining, &transfer)?;
                suggested.push(transfer);
            }
        }

        let cross_group = self.greedy(&remaining);
        debug!(
            in_group = suggested.len(),
            cross_group = cross_group.len(),
            "ideal transfers computed"
        );
        suggested.extend(cross_group);

        let mut flows: Flows = IndexMap::new();
        for transfer in &suggested {
            add_flow(&mut flows, &transfer.from, &transfer.to, transfer.amount.cents())?;
        }
        self.reconcile(&mut flows)?;

        Ok(flows
            .into_iter()
            .filter(|(_, cents)| *cents > BALANCE_TOLERANCE_CENTS)
            .map(|((from, to), cents)| Transfer::new(from, to, Money::from_cents(cents)))
            .collect())
    }

    /// Net position per participant, declaration order. Positive is owed money.
    pub fn balances(&self) -> Result<IndexMap<String, Money>, SettlementError> {
        let mut balances: IndexMap<String, Money> = self
            .ledger
            .participants
            .keys()
            .map(|k| (k.clone(), -self.allocation.share_of(k)))
            .collect();

        let paid = self
            .allocation
            .groups
            .iter()
            .flat_map(|g| g.group.paid.iter().map(|(k, v)| (k.as_str(), *v)))
            .chain(
                self.allocation
                    .fees
                    .iter()
                    .map(|f| (f.paid_by.as_str(), f.amount)),
            );

        for (key, amount) in paid {
            let balance = balances
                .get_mut(key)
                .ok_or_else(|| SettlementError::UnknownParticipant(key.to_string()))?;
            *balance = balance
                .checked_add(amount)
                .ok_or_else(|| SettlementError::Overflow(key.to_string()))?;
        }

        Ok(balances)
    }

    fn apply(
        &self,
        remaining: &mut IndexMap<String, i64>,
        transfer: &Transfer,
    ) -> Result<(), SettlementError> {
        let cents = transfer.amount.cents();
        for (key, delta) in [(&transfer.from, cents), (&transfer.to, -cents)] {
            let balance = remaining
                .get_mut(key.as_str())
                .ok_or_else(|| SettlementError::UnknownParticipant(key.clone()))?;
            *balance = balance
                .checked_add(delta)
                .ok_or_else(|| SettlementError::Overflow(key.clone()))?;
        }
        Ok(())
    }

    /// Largest debtor pays largest creditor until one side runs out.
    ///
    /// Balances and transfers within the tolerance are left alone.
    fn greedy(&self, balances: &IndexMap<String, i64>) -> Vec<Transfer> {
        let order = |key: &str| self.ledger.declaration_index(key).unwrap_or(usize::MAX);

        let mut debtors: Vec<(&str, i64)> = balances
            .iter()
            .filter(|(_, b)| **b < -BALANCE_TOLERANCE_CENTS)
            .map(|(k, b)| (k.as_str(), -*b))
            .collect();
        let mut creditors: Vec<(&str, i64)> = balances
            .iter()
            .filter(|(_, b)| **b > BALANCE_TOLERANCE_CENTS)
            .map(|(k, b)| (k.as_str(), *b))
            .collect();
        debtors.sort_by(|a, b| b.1.cmp(&a.1).then(order(a.0).cmp(&order(b.0))));
        creditors.sort_by(|a, b| b.1.cmp(&a.1).then(order(a.0).cmp(&order(b.0))));

        let mut transfers = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < debtors.len() && j < creditors.len() {
            let amount = debtors[i].1.min(creditors[j].1);
            if amount > BALANCE_TOLERANCE_CENTS {
                transfers.push(Transfer::new(
                    debtors[i].0,
                    creditors[j].0,
                    Money::from_cents(amount),
                ));
                debtors[i].1 -= amount;
                creditors[j].1 -= amount;
            }
            if debtors[i].1 <= BALANCE_TOLERANCE_CENTS {
                i += 1;
            }
            if creditors[j].1 <= BALANCE_TOLERANCE_CENTS {
                j += 1;
            }
        }
        transfers
    }

    /// Subtracts recorded settlements from the ideal flows, pair by pair.
    fn reconcile(&self, flows: &mut Flows) -> Result<(), SettlementError> {
        let mut recorded: IndexMap<(String, String), i64> = IndexMap::new();
        for tx in self.ledger.recorded_settlements() {
            let Transaction::Settlement {
                amount,
                paid_by,
                settle_to,
            } = tx
            else {
                continue;
            };
            for key in [paid_by, settle_to] {
                if !self.ledger.participants.contains_key(key) {
                    return Err(SettlementError::UnknownParticipant(key.clone()));
                }
            }
            if paid_by == settle_to {
                continue;
            }
            let total = recorded
                .entry((paid_by.clone(), settle_to.clone()))
                .or_insert(0);
            *total = total
                .checked_add(amount.cents())
                .ok_or_else(|| SettlementError::Overflow(paid_by.clone()))?;
        }

        for ((from, to), paid) in recorded {
            let ideal = flows.get(&(from.clone(), to.clone())).copied().unwrap_or(0);
            if paid <= ideal {
                flows.insert((from, to), ideal - paid);
                continue;
            }

            if let Some(flow) = flows.get_mut(&(from.clone(), to.clone())) {
                *flow = 0;
            }
            let overage = paid - ideal;
            if overage > BALANCE_TOLERANCE_CENTS {
                debug!(from = %from, to = %to, overage, "overpayment reversed");
                add_flow(flows, &to, &from, overage)?;
            }
        }

        Ok(())
    }
}

/// Adds a flow, netting it against any flow in the opposite direction.
fn add_flow(flows: &mut Flows, from: &str, to: &str, cents: i64) -> Result<(), SettlementError> {
    let mut rest = cents;
    if let Some(back) = flows.get_mut(&(to.to_string(), from.to_string())) {
        if *back > 0 {
            let netted = (*back).min(rest);
            *back -= netted;
            rest -= netted;
        }
    }
    if rest == 0 {
        return Ok(());
    }
    let flow = flows.entry((from.to_string(), to.to_string())).or_insert(0);
    *flow = flow
        .checked_add(rest)
        .ok_or_else(|| SettlementError::Overflow(from.to_string()))?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseOptions;
    use crate::ledger::LedgerBuilder;
    use crate::person::Participant;

    fn settle(text: &str) -> Vec<Transfer> {
        let ledger = LedgerBuilder::new(&ParseOptions::default()).build(text);
        SettlementEngine::new(&ledger).unwrap().settle()
    }

    fn t(from: &str, to: &str, cents: i64) -> Transfer {
        Transfer::new(from, to, Money::from_cents(cents))
    }

    /// Every participant's outgoing minus incoming matches their balance.
    fn assert_zero_sum(text: &str) {
        let ledger = LedgerBuilder::new(&ParseOptions::default()).build(text);
        let engine = SettlementEngine::new(&ledger).unwrap();
        let transfers = engine.settle();
        let balances = engine.balances().unwrap();

        for (key, balance) in &balances {
            let mut net = balance.cents();
            for tx in ledger.recorded_settlements() {
                if let Transaction::Settlement {
                    amount,
                    paid_by,
                    settle_to,
                } = tx
                {
                    if paid_by == key {
                        net += amount.cents();
                    }
                    if settle_to == key {
                        net -= amount.cents();
                    }
                }
            }
            for transfer in &transfers {
                if &transfer.from == key {
                    net += transfer.amount.cents();
                }
                if &transfer.to == key {
                    net -= transfer.amount.cents();
                }
            }
            assert!(net.abs() <= BALANCE_TOLERANCE_CENTS, "{} off by {}", key, net);
        }
    }

    #[test]
    fn test_simple_split() {
        assert_eq!(settle("John\n100\nJane"), vec![t("Jane", "John", 5000)]);
    }

    #[test]
    fn test_group_settlements_stay_in_group() {
        let text = "John\n100 - John, Jane, Bob\nJane\nBob\nAlice\n100 - Alice, Carlos, Luan\nCarlos\nLuan";
        assert_eq!(
            settle(text),
            vec![
                t("Jane", "John", 3334),
                t("Bob", "John", 3333),
                t("Carlos", "Alice", 3334),
                t("Luan", "Alice", 3333),
            ]
        );
    }

    #[test]
    fn test_fee_residual_settles_cross_group() {
        // Group pass settles the 100, the tip is left for the cross-group pass.
        let transfers = settle("John\n100\n10% Tip\nJane");
        assert_eq!(transfers, vec![t("Jane", "John", 5500)]);
    }

    #[test]
    fn test_recorded_partial_payment_reduces_suggestion() {
        assert_eq!(
            settle("John\n100\nJane\n20 > John"),
            vec![t("Jane", "John", 3000)]
        );
    }

    #[test]
    fn test_recorded_exact_payment_removes_suggestion() {
        assert!(settle("John\n100\nJane\n50 > John").is_empty());
    }

    #[test]
    fn test_overpayment_is_reversed() {
        assert_eq!(
            settle("John\n100\nJane\n80 > John"),
            vec![t("John", "Jane", 3000)]
        );
    }

    #[test]
    fn test_one_cent_overpayment_is_tolerated() {
        assert!(settle("John\n100\nJane\n50.01 > John").is_empty());
    }

    #[test]
    fn test_payment_to_wrong_person_is_returned() {
        let transfers = settle("John\n90\nJane\n10 > Bob\nBob");
        assert_eq!(
            transfers,
            vec![
                t("Jane", "John", 3000),
                t("Bob", "John", 3000),
                t("Bob", "Jane", 1000),
            ]
        );
        assert_zero_sum("John\n90\nJane\n10 > Bob\nBob");
    }

    #[test]
    fn test_zero_sum_on_mixed_document() {
        assert_zero_sum(
            "Ann (2)\n210.37\n12.5% Service\nBen\n33.33 Taxi - Ben, Cid\n5 > Ann\nCid!\n19.99 - Ann, Cid\nDee",
        );
    }

    #[test]
    fn test_balances_sum_to_zero() {
        let ledger = LedgerBuilder::new(&ParseOptions::default())
            .build("A\n100\n7.5%\nB 3\n33.33 - A, B\nC");
        let balances = SettlementEngine::new(&ledger).unwrap().balances().unwrap();
        let total: Money = balances.values().sum();
        assert_eq!(total, Money::zero());
    }

    #[test]
    fn test_unknown_payer_degrades_to_empty() {
        let options = ParseOptions::default();
        let mut ledger = LedgerBuilder::new(&options).build("John\n100\nJane");
        ledger.transactions.push(Transaction::Expense {
            amount: Money::from_cents(1000),
            description: String::new(),
            shared_with: vec![],
            paid_by: "Ghost".to_string(),
        });

        let engine = SettlementEngine::new(&ledger).unwrap();
        assert_eq!(
            engine.try_settle(),
            Err(SettlementError::UnknownParticipant("Ghost".to_string()))
        );
        assert!(engine.settle().is_empty());
    }

    #[test]
    fn test_self_settlement_is_ignored() {
        let options = ParseOptions::default();
        let mut ledger = LedgerBuilder::new(&options).build("John\n100\nJane");
        let john = Participant::parse("John", &options);
        ledger.transactions.push(Transaction::Settlement {
            amount: Money::from_cents(500),
            paid_by: john.key.clone(),
            settle_to: john.key,
        });
        assert_eq!(
            SettlementEngine::new(&ledger).unwrap().settle(),
            vec![t("Jane", "John", 5000)]
        );
    }

    #[test]
    fn test_one_cent_balances_need_no_transfer() {
        assert!(settle("A\n0.01\nB").is_empty());
        assert!(settle("A\n0.02 - B\nB").len() == 1);
    }

    #[test]
    fn test_one_cent_short_payment_is_tolerated() {
        assert!(settle("John\n100\nJane\n49.99 > John").is_empty());
    }

    #[test]
    fn test_one_cent_residue_is_not_suggested() {
        // B owes 0.67 and C owes 0.66; nothing below 0.02 is ever suggested.
        let transfers = settle("A\n1.99\nB\nC");
        assert!(transfers.iter().all(|t| t.amount.cents() > BALANCE_TOLERANCE_CENTS));
        assert_eq!(transfers, vec![t("B", "A", 67), t("C", "A", 66)]);
    }

    #[test]
    fn test_add_flow_nets_reverse_direction() {
        let mut flows: Flows = IndexMap::new();
        add_flow(&mut flows, "A", "B", 500).unwrap();
        add_flow(&mut flows, "B", "A", 200).unwrap();
        assert_eq!(flows[&("A".to_string(), "B".to_string())], 300);

        add_flow(&mut flows, "B", "A", 500).unwrap();
        assert_eq!(flows[&("A".to_string(), "B".to_string())], 0);
        assert_eq!(flows[&("B".to_string(), "A".to_string())], 200);
    }
}
