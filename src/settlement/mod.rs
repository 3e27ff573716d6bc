//! Balance computation and greedy transfer matching.
//!
//! FIXED contributors owe their fixed amount; whatever is left of the total is
//! split across SHARE contributors in proportion to their weight. Debtors are
//! then matched against creditors in contributor order, so reordering
//! contributors can change the pairing but never anyone's net position.

use serde::Serialize;
use uuid::Uuid;

use crate::currency::SETTLEMENT_EPSILON;
use crate::ledger::{Allocation, Contributor};

/// One payment from a debtor to a creditor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transfer {
    pub from: Uuid,
    pub from_name: String,
    pub to: Uuid,
    pub to_name: String,
    pub amount: f64,
}

/// Net position of a contributor: positive means they are owed money.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    pub contributor: Uuid,
    pub name: String,
    pub contributed: f64,
    pub owes: f64,
    pub balance: f64,
}

/// Totals behind a settlement, as shown in the expense summary header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SettlementSummary {
    pub total: f64,
    pub fixed_total: f64,
    pub remaining: f64,
    pub total_shares: u32,
    pub cost_per_share: f64,
    pub contributors: usize,
}

pub struct SettlementEngine;

impl SettlementEngine {
    pub fn summary(contributors: &[Contributor]) -> SettlementSummary {
        let total: f64 = contributors.iter().map(Contributor::total).sum();
        let fixed_total: f64 = contributors
            .iter()
            .filter_map(|c| c.allocation.fixed_amount())
            .sum();
        let remaining = (total - fixed_total).max(0.0);
        let total_shares: u32 = contributors
            .iter()
            .filter_map(|c| c.allocation.share_weight())
            .map(u32::from)
            .sum();
        let cost_per_share = if total_shares > 0 {
            remaining / f64::from(total_shares)
        } else {
            0.0
        };
        SettlementSummary {
            total,
            fixed_total,
            remaining,
            total_shares,
            cost_per_share,
            contributors: contributors.len(),
        }
    }

    /// Computes each contributor's balance in contributor order.
    pub fn balances(contributors: &[Contributor]) -> Vec<Balance> {
        let summary = Self::summary(contributors);
        contributors
            .iter()
            .map(|contributor| {
                let contributed = contributor.total();
                let owes = match contributor.allocation {
                    Allocation::Fixed { amount } => amount,
                    Allocation::Share { weight } => summary.cost_per_share * f64::from(weight),
                };
                Balance {
                    contributor: contributor.id,
                    name: contributor.name.clone(),
                    contributed,
                    owes,
                    balance: contributed - owes,
                }
            })
            .collect()
    }

    /// Produces the ordered transfer list that settles every balance.
    pub fn settle(contributors: &[Contributor]) -> Vec<Transfer> {
        let balances = Self::balances(contributors);
        let mut debtors: Vec<(&Balance, f64)> = balances
            .iter()
            .filter(|b| b.balance < 0.0)
            .map(|b| (b, -b.balance))
            .collect();
        let mut creditors: Vec<(&Balance, f64)> = balances
            .iter()
            .filter(|b| b.balance > 0.0)
            .map(|b| (b, b.balance))
            .collect();

        let mut transfers = Vec::new();
        let (mut debtor_index, mut creditor_index) = (0, 0);
        while debtor_index < debtors.len() && creditor_index < creditors.len() {
            let (debtor, owed) = &mut debtors[debtor_index];
            let (creditor, due) = &mut creditors[creditor_index];
            let amount = owed.min(*due);
            if amount > SETTLEMENT_EPSILON {
                transfers.push(Transfer {
                    from: debtor.contributor,
                    from_name: debtor.name.clone(),
                    to: creditor.contributor,
                    to_name: creditor.name.clone(),
                    amount,
                });
            }
            *owed -= amount;
            *due -= amount;
            let debtor_done = *owed < SETTLEMENT_EPSILON;
            let creditor_done = *due < SETTLEMENT_EPSILON;
            if debtor_done {
                debtor_index += 1;
            }
            if creditor_done {
                creditor_index += 1;
            }
        }
        transfers
    }
}
