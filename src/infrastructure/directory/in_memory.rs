use crate::core::errors::SettleError;
use crate::core::models::{group::Group, user::User};
use crate::infrastructure::directory::{IdentityProvider, MembershipProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    users: Arc<RwLock<HashMap<String, User>>>,
    groups: Arc<RwLock<HashMap<String, Group>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        InMemoryDirectory {
            users: Arc::new(RwLock::new(HashMap::new())),
            groups: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn save_user(&self, user: User) {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user);
    }

    pub async fn save_group(&self, group: Group) {
        let mut groups = self.groups.write().await;
        groups.insert(group.id.clone(), group);
    }
}

#[async_trait]
impl MembershipProvider for InMemoryDirectory {
    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, SettleError> {
        let groups = self.groups.read().await;
        Ok(groups.get(group_id).cloned())
    }

    async fn get_user_groups(&self, user_id: &str) -> Result<Vec<Group>, SettleError> {
        let groups = self.groups.read().await;
        let mut found: Vec<Group> = groups.values().filter(|g| g.is_member(user_id)).cloned().collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryDirectory {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, SettleError> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }
}
