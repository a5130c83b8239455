use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::errors::SettleError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Pending,
    Completed,
    Cancelled,
}

impl SettlementStatus {
    /// Cancelled records no longer count toward any balance.
    pub fn is_effective(self) -> bool {
        !matches!(self, SettlementStatus::Cancelled)
    }
}

/// A single "oweer owes payer amount" record. `expense_id` is `None` for
/// manually recorded payments.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Obligation {
    pub id: String,
    pub expense_id: Option<String>,
    pub group_id: String,
    pub payer_id: String,
    #[serde(rename = "payeeId")]
    pub oweer_id: String,
    pub amount: f64,
    pub status: SettlementStatus,
    pub description: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Obligation {
    pub fn is_manual(&self) -> bool {
        self.expense_id.is_none()
    }

    pub fn is_self_payment(&self) -> bool {
        self.payer_id == self.oweer_id
    }

    pub fn is_pending(&self) -> bool {
        self.status == SettlementStatus::Pending
    }

    pub fn between(&self, a: &str, b: &str) -> bool {
        (self.payer_id == a && self.oweer_id == b) || (self.payer_id == b && self.oweer_id == a)
    }
}

/// A payment recorded outside any expense.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualSettlement {
    pub payer_id: String,
    #[serde(rename = "payeeId")]
    pub oweer_id: String,
    pub amount: f64,
    pub description: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettlementAlgorithm {
    /// Nets each existing pair; never introduces a new payer/payee pair.
    Normal,
    /// Greedy debtor/creditor matching over whole-group net balances.
    #[default]
    Advanced,
}

impl FromStr for SettlementAlgorithm {
    type Err = SettleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(SettlementAlgorithm::Normal),
            "advanced" => Ok(SettlementAlgorithm::Advanced),
            other => Err(SettleError::invalid_input(
                "algorithm",
                "Invalid algorithm",
                format!("Unknown settlement algorithm `{}`, expected `normal` or `advanced`", other),
            )),
        }
    }
}

/// A suggested payment that discharges one or more pending obligations.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedSettlement {
    pub from_user_id: String,
    pub to_user_id: String,
    pub from_user_name: String,
    pub to_user_name: String,
    pub amount: f64,
    /// Expenses whose pending obligations feed this payment. For direct
    /// netting these are the expenses between the two users. For the
    /// advanced algorithm the payment settles net positions, so the list
    /// holds every expense behind the payer's debts or the payee's credits;
    /// it may name expenses another suggested payment also draws on.
    #[serde(rename = "consolidatedExpenses")]
    pub consolidated_expense_ids: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Savings {
    pub original_transactions: usize,
    pub optimized_transactions: usize,
    pub reduction_percentage: f64,
}

impl Savings {
    pub fn new(original_transactions: usize, optimized_transactions: usize) -> Self {
        let reduction_percentage = if original_transactions > 0 {
            let saved = original_transactions.saturating_sub(optimized_transactions) as f64;
            (saved / original_transactions as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };
        Savings {
            original_transactions,
            optimized_transactions,
            reduction_percentage,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationReport {
    pub algorithm: SettlementAlgorithm,
    pub optimized_settlements: Vec<OptimizedSettlement>,
    pub savings: Savings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub total_expenses: f64,
    pub total_settlements: usize,
    pub optimized_settlements: Vec<OptimizedSettlement>,
}
