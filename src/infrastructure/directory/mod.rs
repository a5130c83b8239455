//! Collaborator contracts for facts owned by the surrounding CRUD layer.

pub mod in_memory;

use crate::core::errors::SettleError;
use crate::core::models::{group::Group, user::User};
use async_trait::async_trait;

/// Current group memberships.
#[async_trait]
pub trait MembershipProvider: Send + Sync {
    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, SettleError>;
    async fn get_user_groups(&self, user_id: &str) -> Result<Vec<Group>, SettleError>;
}

/// Display identities. A missing user is not an error for the engine; callers
/// fall back to a placeholder name.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, SettleError>;
}
