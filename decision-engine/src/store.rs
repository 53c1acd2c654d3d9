//! Transaction persistence
//!
//! The engine never touches storage itself. These types describe what the
//! surrounding system persists after a decision, and [`InMemoryStore`] is a
//! process-local implementation used by the processor and tests.

use crate::config::DefaultProfile;
use crate::history::HistoryProvider;
use crate::types::{Decision, Location, RiskAssessment, UserHistory};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Lifecycle status of a stored transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Created, not yet decided
    Pending,
    /// Allowed by the engine
    Approved,
    /// Blocked by the engine
    Rejected,
    /// Settled
    Completed,
    /// Failed downstream
    Failed,
    /// Held for manual review
    UnderReview,
}

impl From<Decision> for TransactionStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Reject => TransactionStatus::Rejected,
            Decision::Review => TransactionStatus::UnderReview,
            Decision::Allow | Decision::AllowWithWarning => TransactionStatus::Approved,
        }
    }
}

/// Stored transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Transaction ID
    pub id: Uuid,
    /// Owning user
    pub user_id: String,
    /// Amount
    pub amount: Decimal,
    /// Recipient identifier
    pub recipient_id: String,
    /// Recipient display name
    pub recipient_name: Option<String>,
    /// Merchant name
    pub merchant_name: Option<String>,
    /// Merchant category
    pub merchant_category: Option<String>,
    /// Location
    pub location: Option<Location>,
    /// Lifecycle status
    pub status: TransactionStatus,
    /// Engine decision
    pub decision: Option<Decision>,
    /// Rounded risk score
    pub risk_score: Option<u32>,
    /// Whether the decision was made in fallback mode
    pub fallback_used: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Stored assessment, linked to its transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRecord {
    /// Transaction the assessment belongs to
    pub transaction_id: Uuid,
    /// Engine output
    pub assessment: RiskAssessment,
    /// Scoring model version
    pub model_version: String,
    /// Assessment time
    pub assessed_at: DateTime<Utc>,
}

/// Persists transactions and their assessments
pub trait TransactionStore: Send + Sync {
    /// Insert or replace a transaction; amounts must be positive
    fn put(&self, record: TransactionRecord) -> Result<()>;

    /// Fetch a transaction by ID
    fn get(&self, id: Uuid) -> Result<TransactionRecord>;

    /// A user's transactions, oldest first, paged
    fn list(&self, user_id: &str, limit: usize, offset: usize) -> Result<Vec<TransactionRecord>>;

    /// Insert or replace an assessment
    fn put_assessment(&self, record: AssessmentRecord) -> Result<()>;

    /// Fetch the assessment for a transaction
    fn assessment(&self, transaction_id: Uuid) -> Result<AssessmentRecord>;
}

/// In-memory store backed by concurrent maps
#[derive(Debug, Default)]
pub struct InMemoryStore {
    // user_id -> transactions in insertion order
    transactions: Arc<DashMap<String, Vec<TransactionRecord>>>,
    // transaction_id -> user_id
    owners: Arc<DashMap<Uuid, String>>,
    assessments: Arc<DashMap<Uuid, AssessmentRecord>>,
    default_profile: DefaultProfile,
}

impl InMemoryStore {
    /// Create empty store
    pub fn new(default_profile: DefaultProfile) -> Self {
        Self {
            transactions: Arc::new(DashMap::new()),
            owners: Arc::new(DashMap::new()),
            assessments: Arc::new(DashMap::new()),
            default_profile,
        }
    }

    /// Number of stored transactions across all users
    pub fn transaction_count(&self) -> usize {
        self.owners.len()
    }
}

impl TransactionStore for InMemoryStore {
    fn put(&self, record: TransactionRecord) -> Result<()> {
        // Non-positive amounts would poison the user's derived average
        if record.amount <= Decimal::ZERO {
            return Err(Error::InvalidTransaction(format!(
                "transaction {} has non-positive amount {}",
                record.id, record.amount
            )));
        }

        let mut entry = self.transactions.entry(record.user_id.clone()).or_default();
        if let Some(pos) = entry.iter().position(|r| r.id == record.id) {
            entry[pos] = record;
        } else {
            self.owners.insert(record.id, record.user_id.clone());
            entry.push(record);
        }
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<TransactionRecord> {
        let user_id = self
            .owners
            .get(&id)
            .map(|owner| owner.value().clone())
            .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))?;

        self.transactions
            .get(&user_id)
            .and_then(|records| records.iter().find(|r| r.id == id).cloned())
            .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))
    }

    fn list(&self, user_id: &str, limit: usize, offset: usize) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .transactions
            .get(user_id)
            .map(|records| records.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn put_assessment(&self, record: AssessmentRecord) -> Result<()> {
        self.assessments.insert(record.transaction_id, record);
        Ok(())
    }

    fn assessment(&self, transaction_id: Uuid) -> Result<AssessmentRecord> {
        self.assessments
            .get(&transaction_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| Error::NotFound(format!("assessment for transaction {}", transaction_id)))
    }
}

impl HistoryProvider for InMemoryStore {
    fn history_for(&self, user_id: &str) -> Result<UserHistory> {
        let mut records = self
            .transactions
            .get(user_id)
            .map(|records| records.value().clone())
            .unwrap_or_default();
        records.sort_by_key(|r| r.created_at);
        Ok(UserHistory::from_records(&records, &self.default_profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user_id: &str, amount: i64) -> TransactionRecord {
        TransactionRecord {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            amount: Decimal::from(amount),
            recipient_id: "recipient_0".to_string(),
            recipient_name: None,
            merchant_name: Some("Amazon".to_string()),
            merchant_category: Some("Shopping".to_string()),
            location: None,
            status: TransactionStatus::Pending,
            decision: None,
            risk_score: None,
            fallback_used: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_put_and_get() {
        let store = InMemoryStore::new(DefaultProfile::default());
        let r = record("u1", 100);
        store.put(r.clone()).unwrap();

        assert_eq!(store.get(r.id).unwrap(), r);
        assert_eq!(store.transaction_count(), 1);
        assert!(matches!(store.get(Uuid::new_v4()), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_put_replaces_existing() {
        let store = InMemoryStore::new(DefaultProfile::default());
        let mut r = record("u1", 100);
        store.put(r.clone()).unwrap();

        r.status = TransactionStatus::Completed;
        store.put(r.clone()).unwrap();

        assert_eq!(store.transaction_count(), 1);
        assert_eq!(store.get(r.id).unwrap().status, TransactionStatus::Completed);
    }

    #[test]
    fn test_put_rejects_non_positive_amount() {
        let store = InMemoryStore::new(DefaultProfile::default());
        store.put(record("u1", 100)).unwrap();

        for amount in [0, -50] {
            let result = store.put(record("u1", amount));
            assert!(matches!(result, Err(Error::InvalidTransaction(_))), "amount {amount}");
        }

        assert_eq!(store.transaction_count(), 1);
        assert_eq!(store.history_for("u1").unwrap().avg_amount, Decimal::from(100));
    }

    #[test]
    fn test_list_pages_per_user() {
        let store = InMemoryStore::new(DefaultProfile::default());
        for amount in 1..=5 {
            store.put(record("u1", amount)).unwrap();
        }
        store.put(record("u2", 99)).unwrap();

        let page = store.list("u1", 2, 1).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].amount, Decimal::from(2));
        assert!(store.list("nobody", 10, 0).unwrap().is_empty());
    }

    #[test]
    fn test_history_for_new_user_is_default() {
        let store = InMemoryStore::new(DefaultProfile::default());
        let h = store.history_for("new").unwrap();
        assert_eq!(h.avg_amount, Decimal::from(1200));
        assert_eq!(h.transaction_count, 0);
    }

    #[test]
    fn test_status_from_decision() {
        assert_eq!(TransactionStatus::from(Decision::Reject), TransactionStatus::Rejected);
        assert_eq!(TransactionStatus::from(Decision::Review), TransactionStatus::UnderReview);
        assert_eq!(
            TransactionStatus::from(Decision::AllowWithWarning),
            TransactionStatus::Approved
        );
    }
}
