pub mod analytics;
pub mod balance;
pub mod expense;
pub mod group;
pub mod settlement;
pub mod user;
