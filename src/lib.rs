pub mod config;
pub mod core;
pub mod infrastructure;

pub use crate::core::errors::SettleError;
pub use crate::core::services::{EngineSettings, SettlementService};
pub use crate::infrastructure::directory::in_memory::InMemoryDirectory;
pub use crate::infrastructure::storage::in_memory::InMemoryStorage;

#[cfg(test)]
mod tests; // Include integration tests
