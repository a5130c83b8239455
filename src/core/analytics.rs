//! Per-period expense analytics for one group.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::core::constants::{UNCATEGORIZED_TAG, round_currency};
use crate::core::errors::SettleError;
use crate::core::models::analytics::{
    CategoryStat, ExpenseAnalytics, MemberContribution, PeriodKind, PeriodRange, TrendPoint,
};
use crate::core::models::expense::Expense;
use crate::core::models::group::Group;

impl FromStr for PeriodKind {
    type Err = SettleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(PeriodKind::Week),
            "month" => Ok(PeriodKind::Month),
            "year" => Ok(PeriodKind::Year),
            other => Err(SettleError::InvalidPeriod(format!(
                "unknown period `{}`, expected week, month or year",
                other
            ))),
        }
    }
}

impl PeriodKind {
    /// The calendar week (Monday first), month or year containing `date`.
    pub fn containing(self, date: NaiveDate) -> Result<PeriodRange, SettleError> {
        let out_of_range = || SettleError::InvalidPeriod(format!("no {:?} period around {}", self, date));
        match self {
            PeriodKind::Week => {
                let start = date
                    .checked_sub_signed(Duration::days(i64::from(date.weekday().num_days_from_monday())))
                    .ok_or_else(out_of_range)?;
                let end = start.checked_add_signed(Duration::days(7)).ok_or_else(out_of_range)?;
                let iso = date.iso_week();
                Ok(PeriodRange {
                    label: format!("{}-W{:02}", iso.year(), iso.week()),
                    start,
                    end,
                })
            }
            PeriodKind::Month => {
                let start = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).ok_or_else(out_of_range)?;
                let end = if date.month() == 12 {
                    NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
                }
                .ok_or_else(out_of_range)?;
                Ok(PeriodRange {
                    label: format!("{}-{:02}", date.year(), date.month()),
                    start,
                    end,
                })
            }
            PeriodKind::Year => {
                let start = NaiveDate::from_ymd_opt(date.year(), 1, 1).ok_or_else(out_of_range)?;
                let end = NaiveDate::from_ymd_opt(date.year() + 1, 1, 1).ok_or_else(out_of_range)?;
                Ok(PeriodRange {
                    label: date.year().to_string(),
                    start,
                    end,
                })
            }
        }
    }
}

impl PeriodRange {
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
    }

    pub fn end_instant(&self) -> DateTime<Utc> {
        self.end.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
    }
}

/// Aggregates the expenses created within `range`. Expenses outside the range
/// are ignored, so callers may pass a superset.
pub fn summarize(
    range: &PeriodRange,
    group: &Group,
    expenses: &[Expense],
    top_category_limit: usize,
) -> ExpenseAnalytics {
    let in_period: Vec<&Expense> = expenses
        .iter()
        .filter(|e| e.group_id == group.id && range.contains(e.created_at.date_naive()))
        .collect();

    let total_expenses: f64 = in_period.iter().map(|e| e.amount).sum();
    let expense_count = in_period.len();
    let avg_expense_amount = if expense_count > 0 {
        round_currency(total_expenses / expense_count as f64)
    } else {
        0.0
    };

    ExpenseAnalytics {
        period: range.label.clone(),
        total_expenses,
        expense_count,
        avg_expense_amount,
        top_categories: top_categories(&in_period, total_expenses, top_category_limit),
        member_contributions: member_contributions(group, &in_period),
        expense_trends: daily_trends(range, &in_period),
    }
}

fn top_categories(expenses: &[&Expense], total: f64, limit: usize) -> Vec<CategoryStat> {
    let mut by_tag: HashMap<&str, (f64, usize)> = HashMap::new();
    for expense in expenses {
        if expense.tags.is_empty() {
            let stat = by_tag.entry(UNCATEGORIZED_TAG).or_insert((0.0, 0));
            stat.0 += expense.amount;
            stat.1 += 1;
        }
        for tag in &expense.tags {
            let stat = by_tag.entry(tag.as_str()).or_insert((0.0, 0));
            stat.0 += expense.amount;
            stat.1 += 1;
        }
    }

    let mut categories: Vec<CategoryStat> = by_tag
        .into_iter()
        .map(|(tag, (amount, count))| CategoryStat {
            tag: tag.to_string(),
            amount,
            count,
            percentage: if total > 0.0 {
                (amount / total * 1000.0).round() / 10.0
            } else {
                0.0
            },
        })
        .collect();
    categories.sort_by(|a, b| b.amount.total_cmp(&a.amount).then_with(|| a.tag.cmp(&b.tag)));
    categories.truncate(limit);
    categories
}

fn member_contributions(group: &Group, expenses: &[&Expense]) -> Vec<MemberContribution> {
    group
        .members
        .iter()
        .map(|member| {
            let user_id = member.user.id.as_str();
            let total_paid: f64 = expenses
                .iter()
                .filter(|e| e.created_by == user_id)
                .map(|e| e.amount)
                .sum();
            let total_owed: f64 = expenses.iter().map(|e| e.share_of(user_id)).sum();
            MemberContribution {
                user_id: user_id.to_string(),
                user_name: member.user.name.clone(),
                total_paid,
                total_owed,
                net_contribution: total_paid - total_owed,
            }
        })
        .collect()
}

fn daily_trends(range: &PeriodRange, expenses: &[&Expense]) -> Vec<TrendPoint> {
    let mut per_day: BTreeMap<NaiveDate, (f64, usize)> = range.days().map(|d| (d, (0.0, 0))).collect();
    for expense in expenses {
        if let Some(day) = per_day.get_mut(&expense.created_at.date_naive()) {
            day.0 += expense.amount;
            day.1 += 1;
        }
    }
    per_day
        .into_iter()
        .map(|(date, (amount, count))| TrendPoint { date, amount, count })
        .collect()
}
