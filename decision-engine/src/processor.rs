//! Transaction intake: history lookup, assessment and persistence

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::history::HistoryProvider;
use crate::metrics::Metrics;
use crate::scoring::RiskScorer;
use crate::store::{AssessmentRecord, TransactionRecord, TransactionStatus, TransactionStore};
use crate::types::{DeviceInfo, Location, RiskAssessment, TransactionContext};
use crate::Result;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};
use uuid::Uuid;

/// Request to create a transaction on behalf of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransaction {
    /// Amount
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Recipient identifier
    pub recipient_id: String,
    /// Recipient display name
    #[serde(default)]
    pub recipient_name: Option<String>,
    /// Merchant name
    #[serde(default)]
    pub merchant_name: Option<String>,
    /// Merchant category
    #[serde(default)]
    pub merchant_category: Option<String>,
    /// Location
    #[serde(default)]
    pub location: Option<Location>,
    /// Originating device
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,
}

/// Stored transaction together with the assessment that decided it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTransaction {
    /// Persisted transaction
    pub transaction: TransactionRecord,
    /// Engine verdict
    pub risk_assessment: RiskAssessment,
}

/// Runs the engine for incoming transactions and records the outcome
pub struct TransactionProcessor {
    scorer: RiskScorer,
    history: Arc<dyn HistoryProvider>,
    store: Arc<dyn TransactionStore>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
    model_version: String,
    // user_id -> guard held from history read to record write
    user_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TransactionProcessor {
    /// Create processor using the wall clock
    pub fn new(
        config: &Config,
        history: Arc<dyn HistoryProvider>,
        store: Arc<dyn TransactionStore>,
    ) -> Result<Self> {
        Self::with_clock(config, history, store, Arc::new(SystemClock))
    }

    /// Create processor with an explicit clock
    pub fn with_clock(
        config: &Config,
        history: Arc<dyn HistoryProvider>,
        store: Arc<dyn TransactionStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let scorer = RiskScorer::from_config(config)?.with_clock(clock.clone());
        Ok(Self {
            scorer,
            history,
            store,
            clock,
            metrics: Metrics::new()?,
            model_version: config.model_version.clone(),
            user_locks: DashMap::new(),
        })
    }

    /// Metrics recorded by this processor
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Assess and persist a new transaction for `user_id`
    ///
    /// Submissions for the same user are serialised, so each one is scored
    /// against a history that includes every earlier submission. Different
    /// users proceed in parallel.
    pub fn submit(&self, user_id: &str, request: CreateTransaction) -> Result<SubmittedTransaction> {
        let user_lock = self.user_locks.entry(user_id.to_string()).or_default().clone();
        let _guard = user_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let now = self.clock.now();
        let history = self.history.history_for(user_id)?;

        let context = TransactionContext {
            amount: request.amount,
            recipient_id: request.recipient_id.clone(),
            merchant_name: request.merchant_name.clone(),
            merchant_category: request.merchant_category.clone(),
            location: request.location.clone(),
            time: None,
            device_info: request.device_info,
        };

        let assessment = match self.scorer.assess_risk_at(&context, &history, now) {
            Ok(assessment) => assessment,
            Err(e) => {
                if e.is_invalid_input() {
                    self.metrics.record_invalid_input();
                }
                warn!("Rejected transaction request for user {}: {}", user_id, e);
                return Err(e);
            }
        };
        self.metrics.record_assessment(&assessment);

        let transaction = TransactionRecord {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            amount: request.amount,
            recipient_id: request.recipient_id,
            recipient_name: request.recipient_name,
            merchant_name: request.merchant_name,
            merchant_category: request.merchant_category,
            location: request.location,
            status: TransactionStatus::from(assessment.decision),
            decision: Some(assessment.decision),
            risk_score: Some(assessment.risk_score),
            fallback_used: assessment.fallback_used,
            created_at: now,
        };

        self.store.put(transaction.clone())?;
        self.store.put_assessment(AssessmentRecord {
            transaction_id: transaction.id,
            assessment: assessment.clone(),
            model_version: self.model_version.clone(),
            assessed_at: now,
        })?;

        info!(
            "Transaction created: {} - Decision: {} (score {})",
            transaction.id, assessment.decision, assessment.risk_score
        );

        Ok(SubmittedTransaction {
            transaction,
            risk_assessment: assessment,
        })
    }
}

impl std::fmt::Debug for TransactionProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionProcessor")
            .field("scorer", &self.scorer)
            .field("model_version", &self.model_version)
            .finish_non_exhaustive()
    }
}
