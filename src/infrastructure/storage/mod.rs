use crate::core::errors::SettleError;
use crate::core::models::expense::Expense;
use crate::core::models::settlement::{ManualSettlement, Obligation, SettlementStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persisted expense documents. Lookups are always scoped by group.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn save_expense(&self, expense: Expense) -> Result<(), SettleError>;
    async fn get_expense(&self, group_id: &str, expense_id: &str) -> Result<Option<Expense>, SettleError>;
    async fn get_group_expenses(&self, group_id: &str) -> Result<Vec<Expense>, SettleError>;
    /// Expenses with `start <= created_at < end`.
    async fn get_expenses_between(
        &self,
        group_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Expense>, SettleError>;
    /// Returns whether an expense was removed.
    async fn delete_expense(&self, group_id: &str, expense_id: &str) -> Result<bool, SettleError>;
}

/// Durable collection of obligations. Pure storage: no optimizer logic.
///
/// Every id-based operation takes the group id as well; an id that exists in
/// another group resolves to `SettlementNotFound`.
#[async_trait]
pub trait SettlementLedger: Send + Sync {
    async fn append(&self, obligation: Obligation) -> Result<(), SettleError> {
        self.append_batch(vec![obligation]).await
    }

    async fn append_batch(&self, obligations: Vec<Obligation>) -> Result<(), SettleError>;

    async fn list_pending(&self, group_id: &str) -> Result<Vec<Obligation>, SettleError>;

    async fn list_for_group(&self, group_id: &str) -> Result<Vec<Obligation>, SettleError>;

    async fn list_for_expense(&self, group_id: &str, expense_id: &str) -> Result<Vec<Obligation>, SettleError>;

    /// Returns the number of removed records.
    async fn delete_for_expense(&self, group_id: &str, expense_id: &str) -> Result<usize, SettleError>;

    /// Swaps an expense's obligations for `obligations`. The default is a
    /// plain delete followed by an append; stores that can do better should
    /// make the swap invisible to concurrent readers.
    async fn replace_for_expense(
        &self,
        group_id: &str,
        expense_id: &str,
        obligations: Vec<Obligation>,
    ) -> Result<(), SettleError> {
        self.delete_for_expense(group_id, expense_id).await?;
        self.append_batch(obligations).await
    }

    /// Stores a payment made outside any expense, already completed.
    async fn record_manual(&self, group_id: &str, settlement: ManualSettlement) -> Result<Obligation, SettleError>;

    async fn get(&self, group_id: &str, obligation_id: &str) -> Result<Obligation, SettleError>;

    async fn set_status(
        &self,
        group_id: &str,
        obligation_id: &str,
        status: SettlementStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Obligation, SettleError>;

    async fn delete(&self, group_id: &str, obligation_id: &str) -> Result<(), SettleError>;
}

pub mod in_memory;
