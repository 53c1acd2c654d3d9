//! Risk assessment engine

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::decision::{self, DecisionThresholds};
use crate::factors;
use crate::quality::QualityEstimate;
use crate::types::{MissingField, RiskAssessment, TransactionContext, UserHistory};
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Risk scorer
///
/// Stateless apart from immutable configuration; safe to share across
/// threads and call concurrently.
#[derive(Clone)]
pub struct RiskScorer {
    thresholds: DecisionThresholds,
    high_risk_categories: Vec<String>,
    local_offset: FixedOffset,
    clock: Arc<dyn Clock>,
}

impl RiskScorer {
    /// Create new risk scorer with default configuration and the wall clock
    pub fn new() -> Self {
        Self {
            thresholds: DecisionThresholds::default(),
            high_risk_categories: factors::DEFAULT_HIGH_RISK_CATEGORIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            local_offset: Utc.fix(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Create from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            thresholds: config.thresholds,
            high_risk_categories: config.high_risk_categories.clone(),
            local_offset: config.local_offset()?,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock consulted for transactions without a timestamp
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Decision thresholds in use
    pub fn thresholds(&self) -> &DecisionThresholds {
        &self.thresholds
    }

    /// Assess a transaction against the user's history
    pub fn assess_risk(
        &self,
        transaction: &TransactionContext,
        history: &UserHistory,
    ) -> Result<RiskAssessment> {
        self.assess_risk_at(transaction, history, self.clock.now())
    }

    /// Assess with an explicit "now", used when the transaction has no timestamp
    pub fn assess_risk_at(
        &self,
        transaction: &TransactionContext,
        history: &UserHistory,
        now: DateTime<Utc>,
    ) -> Result<RiskAssessment> {
        validate_transaction(transaction)?;
        validate_history(history)?;
        validate_amount_ratio(transaction, history)?;

        let mut risk_factors = Vec::with_capacity(5);
        let mut missing_fields = Vec::new();

        risk_factors.push(factors::amount_risk(transaction.amount, history));

        match &transaction.location {
            Some(location) => {
                risk_factors.push(factors::location_risk(location, history.last_location));
            }
            None => {
                missing_fields.push(MissingField::Location);
                risk_factors.push(factors::missing_location());
            }
        }

        match transaction.merchant() {
            Some((name, category)) => {
                risk_factors.push(factors::merchant_risk(
                    name,
                    category,
                    history,
                    &self.high_risk_categories,
                ));
            }
            None => {
                missing_fields.push(MissingField::Merchant);
                risk_factors.push(factors::missing_merchant());
            }
        }

        let at = transaction
            .time
            .unwrap_or_else(|| now.with_timezone(&self.local_offset));
        risk_factors.push(factors::behavioral_risk(at));
        risk_factors.push(factors::velocity_risk(history));

        for factor in &risk_factors {
            debug!(
                factor = %factor.name,
                score = factor.score,
                severity = %factor.severity,
                "risk factor evaluated"
            );
        }

        let fallback_used = !missing_fields.is_empty();
        if fallback_used {
            warn!(
                recipient = %transaction.recipient_id,
                missing = ?missing_fields,
                "fallback mode: assessing with incomplete data"
            );
        }

        let total = decision::weighted_total(&risk_factors);
        let quality = QualityEstimate::from_missing(&missing_fields, fallback_used);
        // Confidence is reported alongside the decision but does not gate it.
        let decision = self.thresholds.decide(total);

        let reasons = decision::reasons(&risk_factors, fallback_used);
        let recommendations = decision::recommendations(&risk_factors, decision);

        info!(
            "Risk score calculated: {} (decision: {}, confidence: {}) for recipient {}",
            total,
            decision,
            quality.confidence_score(),
            transaction.recipient_id
        );

        Ok(RiskAssessment {
            decision,
            risk_score: decision::round_score(total),
            confidence_score: quality.confidence_score(),
            fallback_used,
            reasons,
            risk_factors,
            data_quality_score: quality.data_quality_score(),
            missing_fields,
            recommendations,
        })
    }
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RiskScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskScorer")
            .field("thresholds", &self.thresholds)
            .field("high_risk_categories", &self.high_risk_categories)
            .field("local_offset", &self.local_offset)
            .finish_non_exhaustive()
    }
}

/// Preconditions on the transaction
pub fn validate_transaction(transaction: &TransactionContext) -> Result<()> {
    if transaction.amount <= Decimal::ZERO {
        return Err(Error::InvalidTransaction(format!(
            "amount must be positive, got {}",
            transaction.amount
        )));
    }

    if transaction.recipient_id.trim().is_empty() {
        return Err(Error::InvalidTransaction(
            "recipient id is required".to_string(),
        ));
    }

    if let Some(location) = &transaction.location {
        if !location.point().is_valid() {
            return Err(Error::InvalidTransaction(format!(
                "location ({}, {}) is not a valid coordinate",
                location.lat, location.lng
            )));
        }
    }

    Ok(())
}

/// Preconditions on the history; ratios are undefined without them
pub fn validate_history(history: &UserHistory) -> Result<()> {
    if history.avg_amount <= Decimal::ZERO {
        return Err(Error::InvalidHistory(format!(
            "average amount must be positive, got {}",
            history.avg_amount
        )));
    }

    if history.max_amount <= Decimal::ZERO {
        return Err(Error::InvalidHistory(format!(
            "maximum amount must be positive, got {}",
            history.max_amount
        )));
    }

    if !history.avg_daily_transactions.is_finite() || history.avg_daily_transactions < 0.0 {
        return Err(Error::InvalidHistory(format!(
            "average daily transactions must be a non-negative number, got {}",
            history.avg_daily_transactions
        )));
    }

    if let Some(last) = history.last_location {
        if !last.is_valid() {
            return Err(Error::InvalidHistory(format!(
                "last location ({}, {}) is not a valid coordinate",
                last.lat, last.lng
            )));
        }
    }

    Ok(())
}

/// The amount must be comparable to the history average at one decimal place
pub fn validate_amount_ratio(transaction: &TransactionContext, history: &UserHistory) -> Result<()> {
    if factors::displayed_ratio(transaction.amount, history.avg_amount).is_none() {
        return Err(Error::InvalidTransaction(format!(
            "amount {} is out of range for average amount {}",
            transaction.amount, history.avg_amount
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::types::{Decision, FactorKind, GeoPoint, Location, Severity};
    use chrono::TimeZone;

    fn noon() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 10, 12, 0, 0)
            .unwrap()
    }

    fn history() -> UserHistory {
        let mut h = UserHistory::new(Decimal::from(1200), Decimal::from(5000));
        h.transaction_count = 5;
        h.last_location = Some(GeoPoint::new(19.0760, 72.8777));
        h.frequent_merchants.insert("Starbucks".to_string());
        h.frequent_categories.insert("Food & Beverage".to_string());
        h.avg_daily_transactions = 3.0;
        h
    }

    #[test]
    fn test_complete_low_risk_transaction() {
        let scorer = RiskScorer::new();
        let tx = TransactionContext::new(Decimal::from(500), "recipient_1")
            .with_merchant("Starbucks", "Food & Beverage")
            .with_location(Location::new(19.07, 72.87))
            .at(noon());

        let assessment = scorer.assess_risk(&tx, &history()).unwrap();

        assert_eq!(assessment.decision, Decision::Allow);
        assert_eq!(assessment.risk_score, 0);
        assert!(!assessment.fallback_used);
        assert!(assessment.missing_fields.is_empty());
        assert!(assessment.reasons.is_empty());
        assert_eq!(assessment.data_quality_score, 100);
        assert_eq!(assessment.confidence_score, 100);
        assert_eq!(assessment.risk_factors.len(), 5);
    }

    #[test]
    fn test_factor_order() {
        let scorer = RiskScorer::new();
        let tx = TransactionContext::new(Decimal::from(500), "r").at(noon());
        let assessment = scorer.assess_risk(&tx, &history()).unwrap();

        let names: Vec<FactorKind> = assessment.risk_factors.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec![
                FactorKind::Amount,
                FactorKind::MissingLocation,
                FactorKind::MissingMerchant,
                FactorKind::Behavioral,
                FactorKind::Velocity,
            ]
        );
    }

    #[test]
    fn test_partial_merchant_is_missing() {
        let scorer = RiskScorer::new();
        let mut tx = TransactionContext::new(Decimal::from(500), "r")
            .with_location(Location::new(19.07, 72.87))
            .at(noon());
        tx.merchant_name = Some("Starbucks".to_string());

        let assessment = scorer.assess_risk(&tx, &history()).unwrap();
        assert_eq!(assessment.missing_fields, vec![MissingField::Merchant]);
        assert_eq!(assessment.data_quality_score, 80);
        assert_eq!(assessment.confidence_score, 60);
    }

    #[test]
    fn test_clock_used_without_timestamp() {
        let three_am = Utc.with_ymd_and_hms(2024, 3, 10, 3, 0, 0).unwrap();
        let scorer = RiskScorer::new().with_clock(Arc::new(FixedClock(three_am)));
        let tx = TransactionContext::new(Decimal::from(500), "r");

        let assessment = scorer.assess_risk(&tx, &history()).unwrap();
        let behavioral = &assessment.risk_factors[3];
        assert_eq!(behavioral.name, FactorKind::Behavioral);
        assert_eq!(behavioral.score, 10);
        assert_eq!(behavioral.severity, Severity::Medium);
    }

    #[test]
    fn test_clock_read_in_local_offset() {
        // 22:00 UTC is 03:30 at +05:30
        let config = Config {
            local_utc_offset_minutes: 330,
            ..Config::default()
        };
        let late = Utc.with_ymd_and_hms(2024, 3, 10, 22, 0, 0).unwrap();
        let scorer = RiskScorer::from_config(&config).unwrap();
        let tx = TransactionContext::new(Decimal::from(500), "r");

        let assessment = scorer.assess_risk_at(&tx, &history(), late).unwrap();
        assert_eq!(assessment.risk_factors[3].score, 10);
    }

    #[test]
    fn test_configured_thresholds_drive_decision() {
        let config = Config {
            thresholds: DecisionThresholds {
                reject: Decimal::from(15),
                review: Decimal::from(10),
                warn: Decimal::from(5),
            },
            ..Config::default()
        };
        let scorer = RiskScorer::from_config(&config).unwrap();

        // 25*0.25 + 15*0.2 + 10*0.15 + 0 + 15*0.2 = 13.75
        let mut h = history();
        h.avg_daily_transactions = 25.0;
        let tx = TransactionContext::new(Decimal::from(6000), "r").at(noon());

        let assessment = scorer.assess_risk(&tx, &h).unwrap();
        assert_eq!(assessment.risk_score, 14);
        assert_eq!(assessment.decision, Decision::Review);
        assert_eq!(
            assessment.recommendations,
            vec![
                "This transaction requires manual review".to_string(),
                "You will be notified once the review is complete".to_string(),
            ]
        );
    }

    #[test]
    fn test_rejects_zero_average() {
        let scorer = RiskScorer::new();
        let mut h = history();
        h.avg_amount = Decimal::ZERO;
        let tx = TransactionContext::new(Decimal::from(500), "r").at(noon());

        let err = scorer.assess_risk(&tx, &h).unwrap_err();
        assert!(matches!(err, Error::InvalidHistory(_)));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_rejects_zero_maximum() {
        let mut h = history();
        h.max_amount = Decimal::ZERO;
        assert!(matches!(validate_history(&h), Err(Error::InvalidHistory(_))));
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let tx = TransactionContext::new(Decimal::ZERO, "r");
        assert!(matches!(
            validate_transaction(&tx),
            Err(Error::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_rejects_bad_coordinates() {
        let tx = TransactionContext::new(Decimal::ONE, "r").with_location(Location::new(95.0, 0.0));
        assert!(validate_transaction(&tx).is_err());

        let tx = TransactionContext::new(Decimal::ONE, "r")
            .with_location(Location::new(f64::NAN, 0.0));
        assert!(validate_transaction(&tx).is_err());
    }

    #[test]
    fn test_rejects_negative_velocity() {
        let mut h = history();
        h.avg_daily_transactions = -1.0;
        assert!(validate_history(&h).is_err());
    }

    #[test]
    fn test_rejects_amount_ratio_overflow() {
        let mut h = history();
        h.avg_amount = Decimal::new(1, 28);
        let tx = TransactionContext::new(Decimal::MAX, "r").at(noon());

        let err = RiskScorer::new().assess_risk(&tx, &h).unwrap_err();
        assert!(matches!(err, Error::InvalidTransaction(_)));

        h.avg_amount = Decimal::ONE;
        assert!(validate_amount_ratio(&tx, &h).is_err());

        let tx = TransactionContext::new(Decimal::from(1_000_000_000), "r").at(noon());
        let a = RiskScorer::new().assess_risk(&tx, &h).unwrap();
        assert_eq!(
            a.risk_factors[0].reason,
            "Amount is 1000000000.0x higher than your average transaction"
        );
    }
}
