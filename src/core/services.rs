use crate::core::analytics;
use crate::core::balances::{self, GroupTotals};
use crate::core::constants::{
    DEFAULT_RECENT_EXPENSE_LIMIT, DEFAULT_TOP_CATEGORY_LIMIT, DEFAULT_UNKNOWN_USER_NAME, is_negligible,
};
use crate::core::errors::SettleError;
use crate::core::models::{
    analytics::{ExpenseAnalytics, PeriodKind},
    balance::{
        FriendBalance, FriendBalanceBreakdown, FriendsBalance, FriendsSummary, GroupBalanceEntry, OverallBalance,
        UserGroupBalance,
    },
    expense::{
        Expense, ExpenseFilter, ExpenseHistoryEntry, ExpenseListSummary, ExpensePage, ExpenseSplit, ExpenseUpdate,
        NewExpense, PageRequest, Pagination,
    },
    group::Group,
    settlement::{
        GroupSummary, ManualSettlement, Obligation, OptimizationReport, OptimizedSettlement, Savings,
        SettlementAlgorithm, SettlementStatus,
    },
    user::User,
};
use crate::core::obligations::{
    build_obligations, validate_amount, validate_description, validate_page, validate_splits,
};
use crate::core::optimizer;
use crate::infrastructure::directory::{IdentityProvider, MembershipProvider};
use crate::infrastructure::storage::{ExpenseStore, SettlementLedger};
use chrono::{NaiveDate, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tunables the service is built with. See `Config::engine_settings`.
#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub default_algorithm: SettlementAlgorithm,
    pub recent_expense_limit: usize,
    pub top_category_limit: usize,
    pub unknown_user_name: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            default_algorithm: SettlementAlgorithm::Advanced,
            recent_expense_limit: DEFAULT_RECENT_EXPENSE_LIMIT,
            top_category_limit: DEFAULT_TOP_CATEGORY_LIMIT,
            unknown_user_name: DEFAULT_UNKNOWN_USER_NAME.to_string(),
        }
    }
}

/// `group_summary` is `None` when the summary could not be read after the
/// expense was stored. The expense itself is created either way.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCreated {
    pub expense: Expense,
    pub settlements: Vec<Obligation>,
    pub group_summary: Option<GroupSummary>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDetails {
    pub expense: Expense,
    pub related_settlements: Vec<Obligation>,
}

/// Result of an expense update.
///
/// The expense write is the primary operation. If rebuilding its obligations
/// fails afterwards the update is NOT rolled back; `regeneration_warning`
/// carries the failure and the ledger can be repaired with
/// [`SettlementService::resync_expense`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseUpdated {
    pub expense: Expense,
    pub regeneration_warning: Option<String>,
}

pub struct SettlementService<E: ExpenseStore, L: SettlementLedger, D: MembershipProvider + IdentityProvider> {
    expenses: E,
    ledger: L,
    directory: D,
    settings: EngineSettings,
}

impl<E: ExpenseStore, L: SettlementLedger, D: MembershipProvider + IdentityProvider> SettlementService<E, L, D> {
    pub fn new(expenses: E, ledger: L, directory: D) -> Self {
        SettlementService {
            expenses,
            ledger,
            directory,
            settings: EngineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    async fn get_group(&self, group_id: &str) -> Result<Group, SettleError> {
        self.directory
            .get_group(group_id)
            .await?
            .ok_or_else(|| SettleError::GroupNotFound(group_id.to_string()))
    }

    async fn validate_group_membership(&self, group_id: &str, user_id: &str) -> Result<Group, SettleError> {
        let group = self.get_group(group_id).await?;
        if !group.is_member(user_id) {
            return Err(SettleError::NotGroupMember(user_id.to_string()));
        }
        Ok(group)
    }

    fn validate_split_users(&self, group: &Group, splits: &[ExpenseSplit]) -> Result<(), SettleError> {
        for split in splits {
            if !group.is_member(&split.user_id) {
                warn!("User {} in splits not in group {}", split.user_id, group.id);
                return Err(SettleError::InvalidSplitUser(split.user_id.clone()));
            }
        }
        Ok(())
    }

    async fn get_expense_or_err(&self, group_id: &str, expense_id: &str) -> Result<Expense, SettleError> {
        self.expenses
            .get_expense(group_id, expense_id)
            .await?
            .ok_or_else(|| SettleError::ExpenseNotFound(expense_id.to_string()))
    }

    /// Missing or unreachable identities degrade to the placeholder name.
    async fn display_name(&self, user_id: &str) -> String {
        match self.directory.get_user(user_id).await {
            Ok(Some(user)) => user.name,
            Ok(None) => self.settings.unknown_user_name.clone(),
            Err(e) => {
                warn!("Identity lookup for {} failed: {}", user_id, e);
                self.settings.unknown_user_name.clone()
            }
        }
    }

    async fn display_names<'a>(&self, user_ids: impl IntoIterator<Item = &'a str>) -> HashMap<String, String> {
        let mut names = HashMap::new();
        for user_id in user_ids {
            if !names.contains_key(user_id) {
                let name = self.display_name(user_id).await;
                names.insert(user_id.to_string(), name);
            }
        }
        names
    }

    fn normalize_tags(tags: Vec<String>) -> Vec<String> {
        let mut normalized: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.trim().to_string();
            if !tag.is_empty() && !normalized.contains(&tag) {
                normalized.push(tag);
            }
        }
        normalized
    }

    // EXPENSES

    pub async fn create_expense(
        &self,
        group_id: &str,
        created_by: &str,
        new_expense: NewExpense,
    ) -> Result<ExpenseCreated, SettleError> {
        info!(
            "Creating expense in group {} by user {} for amount {}",
            group_id, created_by, new_expense.amount
        );
        let group = self.validate_group_membership(group_id, created_by).await?;

        validate_description(&new_expense.description)?;
        validate_amount("amount", new_expense.amount)?;
        validate_splits(new_expense.amount, &new_expense.splits)?;
        self.validate_split_users(&group, &new_expense.splits)?;

        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            created_by: created_by.to_string(),
            description: new_expense.description.trim().to_string(),
            amount: new_expense.amount,
            splits: new_expense.splits,
            split_type: new_expense.split_type,
            tags: Self::normalize_tags(new_expense.tags),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.expenses.save_expense(expense.clone()).await?;

        let settlements = build_obligations(&expense);
        if let Err(e) = self.ledger.append_batch(settlements.clone()).await {
            warn!("Storing obligations for expense {} failed: {}", expense.id, e);
            if let Err(cleanup) = self.expenses.delete_expense(group_id, &expense.id).await {
                warn!("Removing expense {} after failed create failed: {}", expense.id, cleanup);
            }
            return Err(e);
        }
        debug!(
            "Expense {} created with {} obligations",
            expense.id,
            settlements.len()
        );

        let group_summary = match self.group_summary(group_id).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("Group summary for {} unavailable after creating {}: {}", group_id, expense.id, e);
                None
            }
        };
        Ok(ExpenseCreated {
            expense,
            settlements,
            group_summary,
        })
    }

    pub async fn get_expense(&self, group_id: &str, expense_id: &str) -> Result<ExpenseDetails, SettleError> {
        self.get_group(group_id).await?;
        let expense = self.get_expense_or_err(group_id, expense_id).await?;
        let related_settlements = self.ledger.list_for_expense(group_id, expense_id).await?;
        Ok(ExpenseDetails {
            expense,
            related_settlements,
        })
    }

    /// One page of the matching expenses, most recent first. The summary
    /// covers every match.
    pub async fn list_group_expenses(
        &self,
        group_id: &str,
        filter: &ExpenseFilter,
        page: PageRequest,
    ) -> Result<ExpensePage, SettleError> {
        validate_page(&page)?;
        self.get_group(group_id).await?;
        let mut matching: Vec<Expense> = self
            .expenses
            .get_group_expenses(group_id)
            .await?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let summary = ExpenseListSummary::of(&matching);
        let pagination = Pagination::new(page, matching.len());
        let expenses = matching
            .into_iter()
            .skip(page.offset())
            .take(page.limit)
            .collect();
        Ok(ExpensePage {
            expenses,
            pagination,
            summary,
        })
    }

    /// Applies a partial update, re-validating the split invariant against the
    /// resulting amount and splits. When the amount or the splits change, the
    /// expense's obligations are rebuilt from scratch; see [`ExpenseUpdated`]
    /// for what happens if that rebuild fails.
    pub async fn update_expense(
        &self,
        group_id: &str,
        expense_id: &str,
        edited_by: &str,
        update: ExpenseUpdate,
    ) -> Result<ExpenseUpdated, SettleError> {
        info!(
            "Updating expense {} in group {} by user {}",
            expense_id, group_id, edited_by
        );
        let group = self.validate_group_membership(group_id, edited_by).await?;
        let current = self.get_expense_or_err(group_id, expense_id).await?;

        if let Some(description) = &update.description {
            validate_description(description)?;
        }
        if let Some(amount) = update.amount {
            validate_amount("amount", amount)?;
        }
        if let Some(splits) = &update.splits {
            self.validate_split_users(&group, splits)?;
        }
        let amount = update.amount.unwrap_or(current.amount);
        validate_splits(amount, update.splits.as_deref().unwrap_or(&current.splits))?;

        let now = Utc::now();
        let regenerate = update.touches_obligations();
        let mut expense = current.clone();
        if !update.is_empty() {
            expense.history.push(ExpenseHistoryEntry {
                id: Uuid::new_v4().to_string(),
                user_id: edited_by.to_string(),
                user_name: self.display_name(edited_by).await,
                before_data: current.snapshot(),
                edited_at: now,
            });
        }
        if let Some(description) = update.description {
            expense.description = description.trim().to_string();
        }
        if let Some(splits) = update.splits {
            expense.splits = splits;
        }
        if let Some(tags) = update.tags {
            expense.tags = Self::normalize_tags(tags);
        }
        expense.amount = amount;
        expense.updated_at = now;

        self.expenses.save_expense(expense.clone()).await?;

        let mut regeneration_warning = None;
        if regenerate {
            if let Err(e) = self.rebuild_obligations(&expense).await {
                warn!(
                    "Failed to recalculate settlements for expense {}: {}",
                    expense.id, e
                );
                regeneration_warning = Some(format!(
                    "Expense {} was updated but its settlements could not be recalculated: {}",
                    expense.id, e
                ));
            }
        }

        Ok(ExpenseUpdated {
            expense,
            regeneration_warning,
        })
    }

    async fn rebuild_obligations(&self, expense: &Expense) -> Result<Vec<Obligation>, SettleError> {
        let obligations = build_obligations(expense);
        self.ledger
            .replace_for_expense(&expense.group_id, &expense.id, obligations.clone())
            .await?;
        debug!(
            "Rebuilt {} obligations for expense {}",
            obligations.len(),
            expense.id
        );
        Ok(obligations)
    }

    /// Rebuilds one expense's obligations from its current splits. Safe to
    /// repeat; this is the repair path after a failed regeneration.
    pub async fn resync_expense(&self, group_id: &str, expense_id: &str) -> Result<Vec<Obligation>, SettleError> {
        info!("Resyncing obligations for expense {} in group {}", expense_id, group_id);
        self.get_group(group_id).await?;
        let expense = self.get_expense_or_err(group_id, expense_id).await?;
        self.rebuild_obligations(&expense).await
    }

    pub async fn delete_expense(&self, group_id: &str, expense_id: &str) -> Result<(), SettleError> {
        info!("Deleting expense {} in group {}", expense_id, group_id);
        self.get_group(group_id).await?;
        let expense = self.get_expense_or_err(group_id, expense_id).await?;

        // Expense first: an expense must never be visible without its obligations.
        if !self.expenses.delete_expense(group_id, expense_id).await? {
            return Err(SettleError::ExpenseNotFound(expense_id.to_string()));
        }
        let removed = match self.ledger.delete_for_expense(group_id, expense_id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Removing obligations of expense {} failed: {}", expense_id, e);
                if let Err(restore) = self.expenses.save_expense(expense).await {
                    warn!("Restoring expense {} failed: {}", expense_id, restore);
                }
                return Err(e);
            }
        };
        debug!("Expense {} deleted with {} obligations", expense_id, removed);
        Ok(())
    }

    // SETTLEMENTS

    pub async fn record_manual_settlement(
        &self,
        group_id: &str,
        settlement: ManualSettlement,
    ) -> Result<Obligation, SettleError> {
        info!(
            "Recording manual settlement in group {}: {} paid {} {}",
            group_id, settlement.payer_id, settlement.oweer_id, settlement.amount
        );
        let group = self.get_group(group_id).await?;
        validate_amount("amount", settlement.amount)?;
        if settlement.payer_id == settlement.oweer_id {
            return Err(SettleError::SelfSettlement);
        }
        for user_id in [&settlement.payer_id, &settlement.oweer_id] {
            if !group.is_member(user_id) {
                return Err(SettleError::NotGroupMember(user_id.clone()));
            }
        }

        let description = settlement
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if let Some(d) = &description {
            validate_description(d)?;
        }

        self.ledger
            .record_manual(
                group_id,
                ManualSettlement {
                    description,
                    ..settlement
                },
            )
            .await
    }

    /// Most recent first, optionally restricted to one status.
    pub async fn list_settlements(
        &self,
        group_id: &str,
        status: Option<SettlementStatus>,
    ) -> Result<Vec<Obligation>, SettleError> {
        self.get_group(group_id).await?;
        let mut settlements: Vec<Obligation> = self
            .ledger
            .list_for_group(group_id)
            .await?
            .into_iter()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .collect();
        settlements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(settlements)
    }

    pub async fn get_settlement(&self, group_id: &str, settlement_id: &str) -> Result<Obligation, SettleError> {
        self.get_group(group_id).await?;
        self.ledger.get(group_id, settlement_id).await
    }

    /// Moving to `completed` without an explicit `paid_at` stamps the current
    /// time unless the record already carries one.
    pub async fn update_settlement_status(
        &self,
        group_id: &str,
        settlement_id: &str,
        status: SettlementStatus,
        paid_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<Obligation, SettleError> {
        info!(
            "Setting settlement {} in group {} to {:?}",
            settlement_id, group_id, status
        );
        let existing = self.get_settlement(group_id, settlement_id).await?;
        let paid_at = match (paid_at, status) {
            (Some(at), _) => Some(at),
            (None, SettlementStatus::Completed) if existing.paid_at.is_none() => Some(Utc::now()),
            _ => None,
        };
        self.ledger.set_status(group_id, settlement_id, status, paid_at).await
    }

    pub async fn delete_settlement(&self, group_id: &str, settlement_id: &str) -> Result<(), SettleError> {
        info!("Deleting settlement {} in group {}", settlement_id, group_id);
        self.get_group(group_id).await?;
        self.ledger.delete(group_id, settlement_id).await
    }

    // OPTIMIZATION

    /// Suggested payments for the group's pending obligations. `None` uses the
    /// configured default algorithm.
    pub async fn optimized_settlements(
        &self,
        group_id: &str,
        algorithm: Option<SettlementAlgorithm>,
    ) -> Result<Vec<OptimizedSettlement>, SettleError> {
        self.get_group(group_id).await?;
        let pending = self.ledger.list_pending(group_id).await?;
        self.optimize_pending(&pending, algorithm.unwrap_or(self.settings.default_algorithm))
            .await
    }

    async fn optimize_pending(
        &self,
        pending: &[Obligation],
        algorithm: SettlementAlgorithm,
    ) -> Result<Vec<OptimizedSettlement>, SettleError> {
        let transfers = optimizer::optimize(pending, algorithm);
        let names = self
            .display_names(transfers.iter().flat_map(|t| [t.from.as_str(), t.to.as_str()]))
            .await;
        let name_of = |id: &str| {
            names
                .get(id)
                .cloned()
                .unwrap_or_else(|| self.settings.unknown_user_name.clone())
        };

        debug!(
            "{:?} optimizer reduced {} pending obligations to {} payments",
            algorithm,
            pending.len(),
            transfers.len()
        );
        Ok(transfers
            .into_iter()
            .map(|t| OptimizedSettlement {
                from_user_name: name_of(&t.from),
                to_user_name: name_of(&t.to),
                from_user_id: t.from,
                to_user_id: t.to,
                amount: t.amount,
                consolidated_expense_ids: t.expense_ids,
            })
            .collect())
    }

    pub async fn optimize_settlements(
        &self,
        group_id: &str,
        algorithm: Option<SettlementAlgorithm>,
    ) -> Result<OptimizationReport, SettleError> {
        self.get_group(group_id).await?;
        let algorithm = algorithm.unwrap_or(self.settings.default_algorithm);
        let pending = self.ledger.list_pending(group_id).await?;
        let optimized_settlements = self.optimize_pending(&pending, algorithm).await?;
        let savings = Savings::new(pending.len(), optimized_settlements.len());
        Ok(OptimizationReport {
            algorithm,
            optimized_settlements,
            savings,
        })
    }

    async fn group_summary(&self, group_id: &str) -> Result<GroupSummary, SettleError> {
        let total_expenses = self
            .expenses
            .get_group_expenses(group_id)
            .await?
            .iter()
            .map(|e| e.amount)
            .sum();
        let total_settlements = self.ledger.list_for_group(group_id).await?.len();
        let optimized_settlements = self.optimized_settlements(group_id, None).await?;
        Ok(GroupSummary {
            total_expenses,
            total_settlements,
            optimized_settlements,
        })
    }

    // BALANCES

    pub async fn group_balance(&self, group_id: &str, target_user_id: &str) -> Result<UserGroupBalance, SettleError> {
        debug!("Calculating balance of {} in group {}", target_user_id, group_id);
        self.get_group(group_id).await?;
        let obligations = self.ledger.list_for_group(group_id).await?;
        let GroupTotals {
            total_paid,
            total_owed,
        } = balances::group_totals(&obligations, target_user_id);
        let net_balance = total_paid - total_owed;

        let pending_settlements = obligations
            .into_iter()
            .filter(|o| o.is_pending() && o.oweer_id == target_user_id)
            .collect();
        let expenses = self.expenses.get_group_expenses(group_id).await?;
        let recent_expenses =
            balances::recent_expenses(&expenses, target_user_id, self.settings.recent_expense_limit);

        Ok(UserGroupBalance {
            user_id: target_user_id.to_string(),
            user_name: self.display_name(target_user_id).await,
            total_paid,
            total_owed,
            net_balance,
            owes_you: net_balance > 0.0,
            pending_settlements,
            recent_expenses,
        })
    }

    /// Loads every group's ledger concurrently; the folds themselves are
    /// independent per group.
    async fn user_group_ledgers(&self, user_id: &str) -> Result<Vec<(Group, Vec<Obligation>)>, SettleError> {
        let groups = self.directory.get_user_groups(user_id).await?;
        let ledgers = try_join_all(groups.iter().map(|g| self.ledger.list_for_group(&g.id))).await?;
        Ok(groups.into_iter().zip(ledgers).collect())
    }

    pub async fn friends_balance(&self, user_id: &str) -> Result<FriendsBalance, SettleError> {
        info!("Calculating friends balance for user {}", user_id);
        let group_ledgers = self.user_group_ledgers(user_id).await?;

        let mut friends: BTreeMap<&str, &User> = BTreeMap::new();
        for (group, _) in &group_ledgers {
            for member in &group.members {
                if member.user.id != user_id {
                    friends.entry(member.user.id.as_str()).or_insert(&member.user);
                }
            }
        }

        let mut friends_balance = Vec::new();
        for (friend_id, friend) in friends {
            let mut net_balance = 0.0;
            let mut breakdown = Vec::new();
            let mut last_activity = None;

            for (group, obligations) in group_ledgers.iter().filter(|(g, _)| g.is_member(friend_id)) {
                let delta = balances::pairwise_delta(obligations, user_id, friend_id);
                net_balance += delta;
                if !is_negligible(delta) {
                    breakdown.push(FriendBalanceBreakdown {
                        group_id: group.id.clone(),
                        group_name: group.name.clone(),
                        balance: delta,
                        owes_you: delta > 0.0,
                    });
                }
                last_activity = last_activity.max(balances::last_activity(obligations, user_id, friend_id));
            }

            if is_negligible(net_balance) {
                continue;
            }
            let user_name = if friend.name.trim().is_empty() {
                self.display_name(friend_id).await
            } else {
                friend.name.clone()
            };
            friends_balance.push(FriendBalance {
                user_id: friend_id.to_string(),
                user_name,
                user_image_url: friend.image_url.clone(),
                net_balance,
                owes_you: net_balance > 0.0,
                breakdown,
                last_activity,
            });
        }

        let (total_owed_to_you, total_you_owe) = balances::split_totals(friends_balance.iter().map(|f| f.net_balance));
        let summary = FriendsSummary {
            total_owed_to_you,
            total_you_owe,
            net_balance: total_owed_to_you - total_you_owe,
            friend_count: friends_balance.len(),
            active_groups: group_ledgers.len(),
        };
        Ok(FriendsBalance {
            friends_balance,
            summary,
        })
    }

    pub async fn overall_balance(&self, user_id: &str) -> Result<OverallBalance, SettleError> {
        info!("Calculating overall balance for user {}", user_id);
        let group_ledgers = self.user_group_ledgers(user_id).await?;

        let groups_summary: Vec<GroupBalanceEntry> = group_ledgers
            .iter()
            .map(|(group, obligations)| GroupBalanceEntry {
                group_id: group.id.clone(),
                group_name: group.name.clone(),
                balance: balances::group_totals(obligations, user_id).net(),
            })
            .filter(|entry| !is_negligible(entry.balance))
            .collect();

        let (total_owed_to_you, total_you_owe) = balances::split_totals(groups_summary.iter().map(|g| g.balance));
        Ok(OverallBalance {
            total_owed_to_you,
            total_you_owe,
            net_balance: total_owed_to_you - total_you_owe,
            groups_summary,
        })
    }

    // ANALYTICS

    /// Analytics for the week, month or year containing `reference`
    /// (today, UTC, when absent).
    pub async fn group_analytics(
        &self,
        group_id: &str,
        period: PeriodKind,
        reference: Option<NaiveDate>,
    ) -> Result<ExpenseAnalytics, SettleError> {
        info!("Calculating {:?} analytics for group {}", period, group_id);
        let group = self.get_group(group_id).await?;
        let range = period.containing(reference.unwrap_or_else(|| Utc::now().date_naive()))?;
        let expenses = self
            .expenses
            .get_expenses_between(group_id, range.start_instant(), range.end_instant())
            .await?;
        Ok(analytics::summarize(
            &range,
            &group,
            &expenses,
            self.settings.top_category_limit,
        ))
    }
}
