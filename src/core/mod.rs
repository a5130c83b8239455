pub mod analytics;
pub mod balances;
pub mod constants;
pub mod errors;
pub mod models;
pub mod obligations;
pub mod optimizer;
pub mod services;
