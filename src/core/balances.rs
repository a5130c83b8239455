//! Read-side folds over one group's obligations.
//!
//! Each function looks at a single group's records; the cross-group views in
//! the service are plain sums of these per-group results. Pending and
//! completed obligations count, cancelled ones do not. Positive results mean
//! others owe the subject.

use chrono::{DateTime, Utc};

use crate::core::constants::is_negligible;
use crate::core::models::balance::RecentExpense;
use crate::core::models::expense::Expense;
use crate::core::models::settlement::Obligation;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroupTotals {
    /// Sum of obligations where the user is the payer.
    pub total_paid: f64,
    /// Sum of obligations where the user is the oweer.
    pub total_owed: f64,
}

impl GroupTotals {
    pub fn net(&self) -> f64 {
        self.total_paid - self.total_owed
    }
}

fn effective(obligations: &[Obligation]) -> impl Iterator<Item = &Obligation> {
    obligations.iter().filter(|o| o.status.is_effective())
}

pub fn group_totals(obligations: &[Obligation], user_id: &str) -> GroupTotals {
    effective(obligations).fold(GroupTotals::default(), |mut totals, o| {
        if o.payer_id == user_id {
            totals.total_paid += o.amount;
        }
        if o.oweer_id == user_id {
            totals.total_owed += o.amount;
        }
        totals
    })
}

/// What `friend_id` owes `user_id` minus what `user_id` owes `friend_id`.
pub fn pairwise_delta(obligations: &[Obligation], user_id: &str, friend_id: &str) -> f64 {
    effective(obligations)
        .map(|o| {
            if o.oweer_id == friend_id && o.payer_id == user_id {
                o.amount
            } else if o.oweer_id == user_id && o.payer_id == friend_id {
                -o.amount
            } else {
                0.0
            }
        })
        .sum()
}

pub fn last_activity(
    obligations: &[Obligation],
    user_id: &str,
    friend_id: &str,
) -> Option<DateTime<Utc>> {
    obligations
        .iter()
        .filter(|o| o.between(user_id, friend_id))
        .map(|o| o.paid_at.unwrap_or(o.created_at).max(o.created_at))
        .max()
}

/// Splits signed balances into (owed to the subject, owed by the subject),
/// skipping anything within tolerance of zero.
pub fn split_totals(balances: impl IntoIterator<Item = f64>) -> (f64, f64) {
    balances
        .into_iter()
        .filter(|b| !is_negligible(*b))
        .fold((0.0, 0.0), |(owed_to_you, you_owe), b| {
            if b > 0.0 {
                (owed_to_you + b, you_owe)
            } else {
                (owed_to_you, you_owe + b.abs())
            }
        })
}

/// Most recent expenses the user took part in, with the user's own share.
pub fn recent_expenses(expenses: &[Expense], user_id: &str, limit: usize) -> Vec<RecentExpense> {
    let mut involved: Vec<&Expense> = expenses.iter().filter(|e| e.involves(user_id)).collect();
    involved.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    involved
        .into_iter()
        .take(limit)
        .map(|e| RecentExpense {
            expense_id: e.id.clone(),
            description: e.description.clone(),
            user_share: e.share_of(user_id),
            created_at: e.created_at,
        })
        .collect()
}
