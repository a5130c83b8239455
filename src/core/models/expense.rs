use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::constants::{DEFAULT_PAGE_LIMIT, round_currency};

/// How a split amount was arrived at. Informational only: the stored split
/// amount is always the resolved monetary value.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    #[default]
    Equal,
    Unequal,
    Percentage,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSplit {
    pub user_id: String,
    pub amount: f64,
    #[serde(rename = "type", default)]
    pub kind: SplitType,
}

impl ExpenseSplit {
    pub fn new(user_id: impl Into<String>, amount: f64) -> Self {
        ExpenseSplit {
            user_id: user_id.into(),
            amount,
            kind: SplitType::Equal,
        }
    }
}

/// State of an expense before an edit, kept on the expense's history.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSnapshot {
    pub amount: f64,
    pub description: String,
    pub splits: Vec<ExpenseSplit>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseHistoryEntry {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub before_data: ExpenseSnapshot,
    pub edited_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub group_id: String,
    pub created_by: String,
    pub description: String,
    pub amount: f64,
    pub splits: Vec<ExpenseSplit>,
    pub split_type: SplitType,
    pub tags: Vec<String>,
    #[serde(default)]
    pub history: Vec<ExpenseHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    pub fn share_of(&self, user_id: &str) -> f64 {
        self.splits
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.amount)
            .sum()
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.created_by == user_id || self.splits.iter().any(|s| s.user_id == user_id)
    }

    pub fn snapshot(&self) -> ExpenseSnapshot {
        ExpenseSnapshot {
            amount: self.amount,
            description: self.description.clone(),
            splits: self.splits.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub description: String,
    pub amount: f64,
    pub splits: Vec<ExpenseSplit>,
    #[serde(default)]
    pub split_type: SplitType,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseUpdate {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub splits: Option<Vec<ExpenseSplit>>,
    pub tags: Option<Vec<String>>,
}

impl ExpenseUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.amount.is_none()
            && self.splits.is_none()
            && self.tags.is_none()
    }

    /// Obligations only depend on the amount and the split list.
    pub fn touches_obligations(&self) -> bool {
        self.amount.is_some() || self.splits.is_some()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        if self.from.is_some_and(|from| expense.created_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| expense.created_at > to) {
            return false;
        }
        self.tags.is_empty() || expense.tags.iter().any(|t| self.tags.contains(t))
    }
}

/// One-based page of a listing.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, limit: usize) -> Self {
        PageRequest { page, limit }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total: usize) -> Self {
        Pagination {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total.div_ceil(request.limit),
            has_next: request.page.saturating_mul(request.limit) < total,
            has_prev: request.page > 1,
        }
    }
}

/// Totals over every expense matching the filter, not just the current page.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseListSummary {
    pub total_amount: f64,
    pub expense_count: usize,
    pub avg_expense: f64,
}

impl ExpenseListSummary {
    pub fn of<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> Self {
        let (total_amount, expense_count) = expenses
            .into_iter()
            .fold((0.0, 0), |(total, count), e| (total + e.amount, count + 1));
        let avg_expense = if expense_count > 0 {
            round_currency(total_amount / expense_count as f64)
        } else {
            0.0
        };
        ExpenseListSummary {
            total_amount,
            expense_count,
            avg_expense,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePage {
    pub expenses: Vec<Expense>,
    pub pagination: Pagination,
    pub summary: ExpenseListSummary,
}
