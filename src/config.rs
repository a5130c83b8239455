use crate::core::constants::{DEFAULT_RECENT_EXPENSE_LIMIT, DEFAULT_TOP_CATEGORY_LIMIT, DEFAULT_UNKNOWN_USER_NAME};
use crate::core::models::settlement::SettlementAlgorithm;
use crate::core::services::EngineSettings;
use dotenv::dotenv;
use once_cell::sync::Lazy;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub settlement_algorithm: SettlementAlgorithm,
    pub recent_expense_limit: usize,
    pub top_category_limit: usize,
    pub unknown_user_name: String,
}

impl Config {
    fn from_env() -> Self {
        dotenv().ok();

        Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            settlement_algorithm: env::var("SETTLEMENT_ALGORITHM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            recent_expense_limit: env::var("RECENT_EXPENSE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RECENT_EXPENSE_LIMIT),
            top_category_limit: env::var("TOP_CATEGORY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TOP_CATEGORY_LIMIT),
            unknown_user_name: env::var("UNKNOWN_USER_NAME").unwrap_or_else(|_| DEFAULT_UNKNOWN_USER_NAME.to_string()),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            default_algorithm: self.settlement_algorithm,
            recent_expense_limit: self.recent_expense_limit,
            top_category_limit: self.top_category_limit,
            unknown_user_name: self.unknown_user_name.clone(),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
