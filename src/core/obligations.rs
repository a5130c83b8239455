//! Turns one expense into its pairwise obligations.
//!
//! Every split becomes exactly one [`Obligation`] with the expense creator as
//! payer. The creator's own share is recorded already completed, so the
//! obligations of an expense always sum to the expense amount.

use chrono::Utc;
use uuid::Uuid;

use crate::core::constants::{MAX_DESCRIPTION_LENGTH, MAX_PAGE_LIMIT, SETTLEMENT_TOLERANCE};
use crate::core::errors::SettleError;
use crate::core::models::expense::{Expense, ExpenseSplit, PageRequest};
use crate::core::models::settlement::{Obligation, SettlementStatus};

pub fn validate_description(description: &str) -> Result<(), SettleError> {
    if description.trim().is_empty() {
        return Err(SettleError::invalid_input(
            "description",
            "Invalid description",
            "description cannot be empty",
        ));
    }
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(SettleError::invalid_input(
            "description",
            "description Too Long",
            format!("description cannot exceed {} characters", MAX_DESCRIPTION_LENGTH),
        ));
    }
    Ok(())
}

pub fn validate_amount(field: &str, amount: f64) -> Result<(), SettleError> {
    if !amount.is_finite() {
        return Err(SettleError::invalid_input(
            field,
            "Invalid Amount",
            "Amount must be a finite number",
        ));
    }
    if amount <= 0.0 {
        return Err(SettleError::invalid_input(
            field,
            "Invalid Amount",
            "Amount must be greater than 0",
        ));
    }
    Ok(())
}

pub fn validate_page(page: &PageRequest) -> Result<(), SettleError> {
    if page.page == 0 {
        return Err(SettleError::invalid_input("page", "Invalid page", "page starts at 1"));
    }
    if page.limit == 0 || page.limit > MAX_PAGE_LIMIT {
        return Err(SettleError::invalid_input(
            "limit",
            "Invalid limit",
            format!("limit must be between 1 and {}", MAX_PAGE_LIMIT),
        ));
    }
    Ok(())
}

/// Checks the split invariant: every share positive and the shares summing
/// to `amount` within [`SETTLEMENT_TOLERANCE`]. Nothing is normalised.
pub fn validate_splits(amount: f64, splits: &[ExpenseSplit]) -> Result<(), SettleError> {
    if splits.is_empty() {
        return Err(SettleError::invalid_input(
            "splits",
            "Invalid splits",
            "an expense needs at least one split",
        ));
    }
    for split in splits {
        if split.user_id.trim().is_empty() {
            return Err(SettleError::invalid_input(
                "splits",
                "Invalid splits",
                "split user id cannot be empty",
            ));
        }
        validate_amount("splits.amount", split.amount)?;
    }

    let actual: f64 = splits.iter().map(|s| s.amount).sum();
    if (actual - amount).abs() > SETTLEMENT_TOLERANCE {
        return Err(SettleError::InvalidSplit {
            expected: amount,
            actual,
        });
    }
    Ok(())
}

/// Builds the full obligation set for `expense` from its current splits.
///
/// The result depends only on the expense, so rebuilding after an update (or
/// rebuilding twice) converges on the same records apart from fresh ids.
pub fn build_obligations(expense: &Expense) -> Vec<Obligation> {
    let now = Utc::now();
    expense
        .splits
        .iter()
        .map(|split| {
            let status = if split.user_id == expense.created_by {
                SettlementStatus::Completed
            } else {
                SettlementStatus::Pending
            };
            Obligation {
                id: Uuid::new_v4().to_string(),
                expense_id: Some(expense.id.clone()),
                group_id: expense.group_id.clone(),
                payer_id: expense.created_by.clone(),
                oweer_id: split.user_id.clone(),
                amount: split.amount,
                status,
                description: Some(format!("Share for {}", expense.description)),
                paid_at: None,
                created_at: now,
            }
        })
        .collect()
}
