use super::user::User;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Owner,
    Member,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Owner => "OWNER",
            Role::Member => "MEMBER",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupMember {
    pub user: User,
    pub role: Role,
}

/// Membership facts as served by the group layer. The engine only reads them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub members: Vec<GroupMember>,
}

impl Group {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user.id == user_id)
    }

    /// The first user becomes the owner, the rest plain members.
    pub fn with_members(id: impl Into<String>, name: impl Into<String>, users: Vec<User>) -> Self {
        let members = users
            .into_iter()
            .enumerate()
            .map(|(i, user)| GroupMember {
                user,
                role: if i == 0 { Role::Owner } else { Role::Member },
            })
            .collect();
        Group {
            id: id.into(),
            name: name.into(),
            members,
        }
    }
}
