//! Reduces a group's pending obligations to a smaller set of payments.
//!
//! Two strategies are offered:
//!
//! - [`direct_netting`] nets each pair of users against each other and never
//!   suggests a payment between users who had no direct obligation.
//! - [`min_transactions`] collapses every user to one net balance and matches
//!   debtors against creditors greedily, largest first. It may introduce
//!   payments between users who never dealt with each other directly. The
//!   greedy walk zeroes every balance in at most `debtors + creditors - 1`
//!   payments; it is not a general minimum-transaction-count solver.
//!
//! Only pending obligations between two distinct users are considered.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::constants::{SETTLEMENT_TOLERANCE, round_currency};
use crate::core::models::settlement::{Obligation, SettlementAlgorithm};

/// A payment suggestion before display names are attached.
#[derive(Clone, Debug, PartialEq)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub expense_ids: Vec<String>,
}

pub fn optimize(obligations: &[Obligation], algorithm: SettlementAlgorithm) -> Vec<Transfer> {
    match algorithm {
        SettlementAlgorithm::Normal => direct_netting(obligations),
        SettlementAlgorithm::Advanced => min_transactions(obligations),
    }
}

fn outstanding(obligations: &[Obligation]) -> impl Iterator<Item = &Obligation> {
    obligations
        .iter()
        .filter(|o| o.is_pending() && !o.is_self_payment())
}

fn ordered_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

pub fn direct_netting(obligations: &[Obligation]) -> Vec<Transfer> {
    // (oweer, payer) -> amount oweer owes payer
    let mut owes: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    let mut expenses: BTreeMap<(&str, &str), BTreeSet<&str>> = BTreeMap::new();

    for o in outstanding(obligations) {
        *owes.entry((o.oweer_id.as_str(), o.payer_id.as_str())).or_insert(0.0) += o.amount;
        let ids = expenses
            .entry(ordered_pair(&o.oweer_id, &o.payer_id))
            .or_default();
        if let Some(expense_id) = &o.expense_id {
            ids.insert(expense_id.as_str());
        }
    }

    let mut transfers = Vec::new();
    for (&(a, b), ids) in &expenses {
        let a_owes_b = owes.get(&(a, b)).copied().unwrap_or(0.0);
        let b_owes_a = owes.get(&(b, a)).copied().unwrap_or(0.0);
        let net = a_owes_b - b_owes_a;

        let (from, to) = if net > SETTLEMENT_TOLERANCE {
            (a, b)
        } else if net < -SETTLEMENT_TOLERANCE {
            (b, a)
        } else {
            continue;
        };
        transfers.push(Transfer {
            from: from.to_string(),
            to: to.to_string(),
            amount: round_currency(net.abs()),
            expense_ids: ids.iter().map(|id| id.to_string()).collect(),
        });
    }
    transfers
}

/// Net position per user over the pending obligations: positive means the
/// user owes money overall, negative means the user is owed money.
pub fn net_positions(obligations: &[Obligation]) -> BTreeMap<String, f64> {
    let mut positions: BTreeMap<String, f64> = BTreeMap::new();
    for o in outstanding(obligations) {
        *positions.entry(o.oweer_id.clone()).or_insert(0.0) += o.amount;
        *positions.entry(o.payer_id.clone()).or_insert(0.0) -= o.amount;
    }
    positions
}

pub fn min_transactions(obligations: &[Obligation]) -> Vec<Transfer> {
    let positions = net_positions(obligations);

    let mut debtors: Vec<(String, f64)> = positions
        .iter()
        .filter(|(_, bal)| **bal > SETTLEMENT_TOLERANCE)
        .map(|(user, bal)| (user.clone(), *bal))
        .collect();
    let mut creditors: Vec<(String, f64)> = positions
        .iter()
        .filter(|(_, bal)| **bal < -SETTLEMENT_TOLERANCE)
        .map(|(user, bal)| (user.clone(), -bal))
        .collect();

    // Largest first; the sort is stable so equal magnitudes stay in id order.
    debtors.sort_by(|a, b| b.1.total_cmp(&a.1));
    creditors.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut transfers = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < debtors.len() && j < creditors.len() {
        let settled = debtors[i].1.min(creditors[j].1);

        if settled > SETTLEMENT_TOLERANCE {
            let (debtor, creditor) = (&debtors[i].0, &creditors[j].0);
            transfers.push(Transfer {
                from: debtor.clone(),
                to: creditor.clone(),
                amount: round_currency(settled),
                expense_ids: related_expenses(obligations, debtor, creditor),
            });
        }

        debtors[i].1 -= settled;
        creditors[j].1 -= settled;

        if debtors[i].1 <= SETTLEMENT_TOLERANCE {
            i += 1;
        }
        if creditors[j].1 <= SETTLEMENT_TOLERANCE {
            j += 1;
        }
    }
    transfers
}

/// Expenses behind a debtor's debt or a creditor's credit.
fn related_expenses(obligations: &[Obligation], debtor: &str, creditor: &str) -> Vec<String> {
    outstanding(obligations)
        .filter(|o| o.oweer_id == debtor || o.payer_id == creditor)
        .filter_map(|o| o.expense_id.as_deref())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
