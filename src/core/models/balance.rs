use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::settlement::Obligation;

// Sign convention for every view below: positive means others owe the
// subject, negative means the subject owes others.

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentExpense {
    pub expense_id: String,
    pub description: String,
    pub user_share: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGroupBalance {
    pub user_id: String,
    pub user_name: String,
    pub total_paid: f64,
    pub total_owed: f64,
    pub net_balance: f64,
    pub owes_you: bool,
    pub pending_settlements: Vec<Obligation>,
    pub recent_expenses: Vec<RecentExpense>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendBalanceBreakdown {
    pub group_id: String,
    pub group_name: String,
    pub balance: f64,
    pub owes_you: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendBalance {
    pub user_id: String,
    pub user_name: String,
    pub user_image_url: Option<String>,
    pub net_balance: f64,
    pub owes_you: bool,
    pub breakdown: Vec<FriendBalanceBreakdown>,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsSummary {
    pub total_owed_to_you: f64,
    pub total_you_owe: f64,
    pub net_balance: f64,
    pub friend_count: usize,
    pub active_groups: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsBalance {
    pub friends_balance: Vec<FriendBalance>,
    pub summary: FriendsSummary,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBalanceEntry {
    pub group_id: String,
    pub group_name: String,
    pub balance: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallBalance {
    pub total_owed_to_you: f64,
    pub total_you_owe: f64,
    pub net_balance: f64,
    pub groups_summary: Vec<GroupBalanceEntry>,
}
