use crate::core::constants::MANUAL_SETTLEMENT_DESCRIPTION;
use crate::core::errors::SettleError;
use crate::core::models::expense::Expense;
use crate::core::models::settlement::{ManualSettlement, Obligation, SettlementStatus};
use crate::infrastructure::storage::{ExpenseStore, SettlementLedger};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryStorage {
    expenses: Arc<RwLock<HashMap<String, Expense>>>,
    // Insertion order is kept so listings are stable.
    obligations: Arc<RwLock<Vec<Obligation>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage {
            expenses: Arc::new(RwLock::new(HashMap::new())),
            obligations: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

fn in_scope<'a>(group_id: &'a str, obligation_id: &'a str) -> impl Fn(&Obligation) -> bool + 'a {
    move |o: &Obligation| o.id == obligation_id && o.group_id == group_id
}

fn for_expense<'a>(group_id: &'a str, expense_id: &'a str) -> impl Fn(&Obligation) -> bool + 'a {
    move |o: &Obligation| o.group_id == group_id && o.expense_id.as_deref() == Some(expense_id)
}

#[async_trait]
impl ExpenseStore for InMemoryStorage {
    async fn save_expense(&self, expense: Expense) -> Result<(), SettleError> {
        let mut expenses = self.expenses.write().await;
        expenses.insert(expense.id.clone(), expense);
        Ok(())
    }

    async fn get_expense(&self, group_id: &str, expense_id: &str) -> Result<Option<Expense>, SettleError> {
        let expenses = self.expenses.read().await;
        Ok(expenses
            .get(expense_id)
            .filter(|e| e.group_id == group_id)
            .cloned())
    }

    async fn get_group_expenses(&self, group_id: &str) -> Result<Vec<Expense>, SettleError> {
        let expenses = self.expenses.read().await;
        let mut found: Vec<Expense> = expenses
            .values()
            .filter(|e| e.group_id == group_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn get_expenses_between(
        &self,
        group_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Expense>, SettleError> {
        Ok(self
            .get_group_expenses(group_id)
            .await?
            .into_iter()
            .filter(|e| e.created_at >= start && e.created_at < end)
            .collect())
    }

    async fn delete_expense(&self, group_id: &str, expense_id: &str) -> Result<bool, SettleError> {
        let mut expenses = self.expenses.write().await;
        if expenses.get(expense_id).is_some_and(|e| e.group_id == group_id) {
            expenses.remove(expense_id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl SettlementLedger for InMemoryStorage {
    async fn append_batch(&self, obligations: Vec<Obligation>) -> Result<(), SettleError> {
        let mut stored = self.obligations.write().await;
        stored.extend(obligations);
        Ok(())
    }

    async fn list_pending(&self, group_id: &str) -> Result<Vec<Obligation>, SettleError> {
        let stored = self.obligations.read().await;
        Ok(stored
            .iter()
            .filter(|o| o.group_id == group_id && o.is_pending())
            .cloned()
            .collect())
    }

    async fn list_for_group(&self, group_id: &str) -> Result<Vec<Obligation>, SettleError> {
        let stored = self.obligations.read().await;
        Ok(stored.iter().filter(|o| o.group_id == group_id).cloned().collect())
    }

    async fn list_for_expense(&self, group_id: &str, expense_id: &str) -> Result<Vec<Obligation>, SettleError> {
        let stored = self.obligations.read().await;
        Ok(stored
            .iter()
            .filter(|o| for_expense(group_id, expense_id)(*o))
            .cloned()
            .collect())
    }

    async fn delete_for_expense(&self, group_id: &str, expense_id: &str) -> Result<usize, SettleError> {
        let mut stored = self.obligations.write().await;
        let before = stored.len();
        let matches = for_expense(group_id, expense_id);
        stored.retain(|o| !matches(o));
        Ok(before - stored.len())
    }

    async fn replace_for_expense(
        &self,
        group_id: &str,
        expense_id: &str,
        obligations: Vec<Obligation>,
    ) -> Result<(), SettleError> {
        // One write guard for both halves: readers see the old set or the new one.
        let mut stored = self.obligations.write().await;
        let matches = for_expense(group_id, expense_id);
        stored.retain(|o| !matches(o));
        stored.extend(obligations);
        Ok(())
    }

    async fn record_manual(&self, group_id: &str, settlement: ManualSettlement) -> Result<Obligation, SettleError> {
        let now = Utc::now();
        let obligation = Obligation {
            id: Uuid::new_v4().to_string(),
            expense_id: None,
            group_id: group_id.to_string(),
            payer_id: settlement.payer_id,
            oweer_id: settlement.oweer_id,
            amount: settlement.amount,
            status: SettlementStatus::Completed,
            description: Some(
                settlement
                    .description
                    .unwrap_or_else(|| MANUAL_SETTLEMENT_DESCRIPTION.to_string()),
            ),
            paid_at: Some(settlement.paid_at.unwrap_or(now)),
            created_at: now,
        };
        let mut stored = self.obligations.write().await;
        stored.push(obligation.clone());
        Ok(obligation)
    }

    async fn get(&self, group_id: &str, obligation_id: &str) -> Result<Obligation, SettleError> {
        let stored = self.obligations.read().await;
        stored
            .iter()
            .find(|o| in_scope(group_id, obligation_id)(*o))
            .cloned()
            .ok_or_else(|| SettleError::SettlementNotFound(obligation_id.to_string()))
    }

    async fn set_status(
        &self,
        group_id: &str,
        obligation_id: &str,
        status: SettlementStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Obligation, SettleError> {
        let mut stored = self.obligations.write().await;
        let obligation = stored
            .iter_mut()
            .find(|o| in_scope(group_id, obligation_id)(&**o))
            .ok_or_else(|| SettleError::SettlementNotFound(obligation_id.to_string()))?;
        obligation.status = status;
        if paid_at.is_some() {
            obligation.paid_at = paid_at;
        }
        Ok(obligation.clone())
    }

    async fn delete(&self, group_id: &str, obligation_id: &str) -> Result<(), SettleError> {
        let mut stored = self.obligations.write().await;
        let position = stored
            .iter()
            .position(|o| in_scope(group_id, obligation_id)(o))
            .ok_or_else(|| SettleError::SettlementNotFound(obligation_id.to_string()))?;
        stored.remove(position);
        Ok(())
    }
}
