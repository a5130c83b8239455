mod optimizer_tests;

use crate::core::errors::SettleError;
use crate::core::models::expense::{Expense, ExpenseSplit, NewExpense, SplitType};
use crate::core::models::group::Group;
use crate::core::models::settlement::{ManualSettlement, Obligation, SettlementStatus};
use crate::core::models::user::User;
use crate::core::services::SettlementService;
use crate::infrastructure::directory::in_memory::InMemoryDirectory;
use crate::infrastructure::storage::{ExpenseStore, SettlementLedger};
use crate::infrastructure::storage::in_memory::InMemoryStorage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .try_init();
}

pub type TestService = SettlementService<InMemoryStorage, InMemoryStorage, InMemoryDirectory>;

/// alice, bob and carol share "g1"; alice, bob and dave share "g2".
pub async fn seeded_directory() -> InMemoryDirectory {
    init_tracing();
    let directory = InMemoryDirectory::new();
    let alice = User::new("alice", "Alice");
    let bob = User::new("bob", "Bob");
    let carol = User::new("carol", "Carol");
    let dave = User::new("dave", "Dave");
    for user in [&alice, &bob, &carol, &dave] {
        directory.save_user(user.clone()).await;
    }
    directory
        .save_group(Group::with_members("g1", "Flat", vec![alice.clone(), bob.clone(), carol]))
        .await;
    directory
        .save_group(Group::with_members("g2", "Trip", vec![alice, bob, dave]))
        .await;
    directory
}

pub async fn create_test_service() -> TestService {
    let storage = InMemoryStorage::new();
    SettlementService::new(storage.clone(), storage, seeded_directory().await)
}

/// Same as [`create_test_service`] but keeps a handle on the shared storage.
pub async fn create_test_service_with_storage() -> (TestService, InMemoryStorage) {
    let storage = InMemoryStorage::new();
    let service = SettlementService::new(storage.clone(), storage.clone(), seeded_directory().await);
    (service, storage)
}

pub fn split(user_id: &str, amount: f64) -> ExpenseSplit {
    ExpenseSplit::new(user_id, amount)
}

pub fn new_expense(description: &str, amount: f64, splits: Vec<ExpenseSplit>) -> NewExpense {
    NewExpense {
        description: description.to_string(),
        amount,
        splits,
        split_type: SplitType::Unequal,
        tags: Vec::new(),
    }
}

/// An expense document with a fixed creation time, for storing directly.
pub fn expense_at(
    id: &str,
    group_id: &str,
    created_by: &str,
    amount: f64,
    splits: Vec<ExpenseSplit>,
    tags: &[&str],
    created_at: DateTime<Utc>,
) -> Expense {
    Expense {
        id: id.to_string(),
        group_id: group_id.to_string(),
        created_by: created_by.to_string(),
        description: format!("expense {}", id),
        amount,
        splits,
        split_type: SplitType::Unequal,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        history: Vec::new(),
        created_at,
        updated_at: created_at,
    }
}

/// A pending obligation for the pure optimizer and balance tests.
pub fn owes(oweer: &str, payer: &str, amount: f64) -> Obligation {
    Obligation {
        id: format!("{}-{}-{}", oweer, payer, amount),
        expense_id: Some(format!("e-{}-{}", oweer, payer)),
        group_id: "g1".to_string(),
        payer_id: payer.to_string(),
        oweer_id: oweer.to_string(),
        amount,
        status: SettlementStatus::Pending,
        description: None,
        paid_at: None,
        created_at: Utc::now(),
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {} but got {}",
        expected,
        actual
    );
}

fn unavailable(switch: &AtomicBool, what: &str) -> Result<(), SettleError> {
    if switch.load(Ordering::SeqCst) {
        return Err(SettleError::StorageError(format!("{} unavailable", what)));
    }
    Ok(())
}

/// Ledger whose operations can be made to fail on demand.
#[derive(Clone, Default)]
pub struct FlakyLedger {
    inner: InMemoryStorage,
    pub fail_replace: Arc<AtomicBool>,
    pub fail_append: Arc<AtomicBool>,
    pub fail_list_group: Arc<AtomicBool>,
    pub fail_delete_for_expense: Arc<AtomicBool>,
}

impl FlakyLedger {
    pub fn new(inner: InMemoryStorage) -> Self {
        FlakyLedger {
            inner,
            ..Default::default()
        }
    }
}

#[async_trait]
impl SettlementLedger for FlakyLedger {
    async fn append_batch(&self, obligations: Vec<Obligation>) -> Result<(), SettleError> {
        unavailable(&self.fail_append, "append")?;
        self.inner.append_batch(obligations).await
    }

    async fn list_pending(&self, group_id: &str) -> Result<Vec<Obligation>, SettleError> {
        self.inner.list_pending(group_id).await
    }

    async fn list_for_group(&self, group_id: &str) -> Result<Vec<Obligation>, SettleError> {
        unavailable(&self.fail_list_group, "group listing")?;
        self.inner.list_for_group(group_id).await
    }

    async fn list_for_expense(&self, group_id: &str, expense_id: &str) -> Result<Vec<Obligation>, SettleError> {
        self.inner.list_for_expense(group_id, expense_id).await
    }

    async fn delete_for_expense(&self, group_id: &str, expense_id: &str) -> Result<usize, SettleError> {
        unavailable(&self.fail_delete_for_expense, "obligation delete")?;
        self.inner.delete_for_expense(group_id, expense_id).await
    }

    async fn replace_for_expense(
        &self,
        group_id: &str,
        expense_id: &str,
        obligations: Vec<Obligation>,
    ) -> Result<(), SettleError> {
        unavailable(&self.fail_replace, "replace")?;
        self.inner.replace_for_expense(group_id, expense_id, obligations).await
    }

    async fn record_manual(&self, group_id: &str, settlement: ManualSettlement) -> Result<Obligation, SettleError> {
        self.inner.record_manual(group_id, settlement).await
    }

    async fn get(&self, group_id: &str, obligation_id: &str) -> Result<Obligation, SettleError> {
        self.inner.get(group_id, obligation_id).await
    }

    async fn set_status(
        &self,
        group_id: &str,
        obligation_id: &str,
        status: SettlementStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Obligation, SettleError> {
        self.inner.set_status(group_id, obligation_id, status, paid_at).await
    }

    async fn delete(&self, group_id: &str, obligation_id: &str) -> Result<(), SettleError> {
        self.inner.delete(group_id, obligation_id).await
    }
}

/// Expense store whose deletes can be made to fail on demand.
#[derive(Clone, Default)]
pub struct FlakyExpenses {
    inner: InMemoryStorage,
    pub fail_delete: Arc<AtomicBool>,
}

impl FlakyExpenses {
    pub fn new(inner: InMemoryStorage) -> Self {
        FlakyExpenses {
            inner,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ExpenseStore for FlakyExpenses {
    async fn save_expense(&self, expense: Expense) -> Result<(), SettleError> {
        self.inner.save_expense(expense).await
    }

    async fn get_expense(&self, group_id: &str, expense_id: &str) -> Result<Option<Expense>, SettleError> {
        self.inner.get_expense(group_id, expense_id).await
    }

    async fn get_group_expenses(&self, group_id: &str) -> Result<Vec<Expense>, SettleError> {
        self.inner.get_group_expenses(group_id).await
    }

    async fn get_expenses_between(
        &self,
        group_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Expense>, SettleError> {
        self.inner.get_expenses_between(group_id, start, end).await
    }

    async fn delete_expense(&self, group_id: &str, expense_id: &str) -> Result<bool, SettleError> {
        unavailable(&self.fail_delete, "expense delete")?;
        self.inner.delete_expense(group_id, expense_id).await
    }
}
