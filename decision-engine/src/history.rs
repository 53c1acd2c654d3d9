//! Deriving a user's behaviour profile from stored transactions

use crate::config::DefaultProfile;
use crate::store::TransactionRecord;
use crate::types::UserHistory;
use crate::Result;
use rust_decimal::Decimal;

/// Supplies the history profile for a user
pub trait HistoryProvider: Send + Sync {
    /// Profile for `user_id`; users without transactions get a default profile
    fn history_for(&self, user_id: &str) -> Result<UserHistory>;
}

impl UserHistory {
    /// Aggregate stored transactions, oldest first, into a profile
    pub fn from_records(records: &[TransactionRecord], default_profile: &DefaultProfile) -> Self {
        if records.is_empty() {
            return UserHistory::new(default_profile.avg_amount, default_profile.max_amount);
        }

        let count = records.len();
        let total: Decimal = records.iter().map(|r| r.amount).sum();
        let avg_amount = total / Decimal::from(count as u64);
        let max_amount = records
            .iter()
            .map(|r| r.amount)
            .max()
            .unwrap_or(default_profile.max_amount);

        let mut history = UserHistory::new(avg_amount, max_amount);
        history.transaction_count = count as u64;
        history.last_transaction_time = records.iter().map(|r| r.created_at).max();
        history.last_location = records
            .iter()
            .rev()
            .find_map(|r| r.location.as_ref().map(|l| l.point()));
        history.frequent_merchants = records
            .iter()
            .filter_map(|r| r.merchant_name.clone())
            .filter(|m| !m.is_empty())
            .collect();
        history.frequent_categories = records
            .iter()
            .filter_map(|r| r.merchant_category.clone())
            .filter(|c| !c.is_empty())
            .collect();
        history.avg_daily_transactions = count as f64 / active_days(records) as f64;
        history
    }
}

/// Whole days from the first to the last record, inclusive
fn active_days(records: &[TransactionRecord]) -> i64 {
    let first = records.iter().map(|r| r.created_at).min();
    let last = records.iter().map(|r| r.created_at).max();
    match (first, last) {
        (Some(first), Some(last)) => (last - first).num_days() + 1,
        _ => 1,
    }
}
