/// Currency tolerance shared by split validation, the optimizer and the
/// balance views. Amounts within this distance of each other are equal.
pub const SETTLEMENT_TOLERANCE: f64 = 0.01;

pub const MAX_DESCRIPTION_LENGTH: usize = 500;

pub const UNCATEGORIZED_TAG: &str = "uncategorized";

pub const MANUAL_SETTLEMENT_DESCRIPTION: &str = "Manual settlement";

pub const DEFAULT_RECENT_EXPENSE_LIMIT: usize = 5;

pub const DEFAULT_TOP_CATEGORY_LIMIT: usize = 10;

pub const DEFAULT_UNKNOWN_USER_NAME: &str = "Unknown";

pub const DEFAULT_PAGE_LIMIT: usize = 20;

pub const MAX_PAGE_LIMIT: usize = 100;

/// Rounds a monetary amount to whole cents.
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub fn is_negligible(amount: f64) -> bool {
    amount.abs() <= SETTLEMENT_TOLERANCE
}
