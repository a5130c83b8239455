use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

impl FieldError {
    pub fn new(field: &str, title: impl Into<String>, description: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            title: title.into(),
            description: description.into(),
        }
    }
}

#[derive(Error, Debug, Clone, Serialize, PartialEq)]
pub enum SettleError {
    /// Generic input validation error with detailed field information
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),

    /// Split amounts don't add up to the expense amount
    #[error("Split amounts sum to {actual} but expense amount is {expected}")]
    InvalidSplit { expected: f64, actual: f64 },

    /// User specified in split is not a member of the group
    #[error("Invalid split user: {0}")]
    InvalidSplitUser(String),

    /// Cannot record a payment from a user to themselves
    #[error("Cannot create settlement to self")]
    SelfSettlement,

    #[error("Invalid analytics period: {0}")]
    InvalidPeriod(String),

    #[error("Group {0} not found")]
    GroupNotFound(String),

    #[error("User {0} is not a group member")]
    NotGroupMember(String),

    #[error("Expense {0} not found")]
    ExpenseNotFound(String),

    #[error("Settlement {0} not found")]
    SettlementNotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl SettleError {
    pub(crate) fn invalid_input(field: &str, title: &str, description: impl Into<String>) -> Self {
        SettleError::InvalidInput(field.to_string(), FieldError::new(field, title, description))
    }

    /// Rejections raised before anything is written.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SettleError::InvalidInput(..)
                | SettleError::InvalidSplit { .. }
                | SettleError::InvalidSplitUser(_)
                | SettleError::SelfSettlement
                | SettleError::InvalidPeriod(_)
        )
    }

    /// An id did not resolve within the caller's group scope.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SettleError::GroupNotFound(_)
                | SettleError::NotGroupMember(_)
                | SettleError::ExpenseNotFound(_)
                | SettleError::SettlementNotFound(_)
        )
    }
}
